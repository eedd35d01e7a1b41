// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the memory engine over a temp-dir database with
//! mock adapters and a manual clock, and hands out the higher-level
//! components wired to the same state.

use std::sync::Arc;

use hindsight_cache::TtlCache;
use hindsight_config::model::HindsightConfig;
use hindsight_core::{Embedder, Fetcher, HindsightError};
use hindsight_memory::MemoryService;
use hindsight_research::ResearchPipeline;
use hindsight_storage::Database;
use hindsight_trigger::InjectionOrchestrator;

use crate::clock::ManualClock;
use crate::mock_embedder::MockEmbedder;
use crate::mock_fetcher::MockFetcher;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    embedder: Option<Arc<MockEmbedder>>,
    without_embedder: bool,
    fetcher: Option<Arc<MockFetcher>>,
    configure: Vec<Box<dyn FnOnce(&mut HindsightConfig) + Send>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            embedder: None,
            without_embedder: false,
            fetcher: None,
            configure: Vec::new(),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<MockEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Run with no embedding provider at all.
    pub fn without_embedder(mut self) -> Self {
        self.without_embedder = true;
        self
    }

    pub fn with_fetcher(mut self, fetcher: MockFetcher) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Adjust the generated configuration before components are built.
    pub fn configure(mut self, f: impl FnOnce(&mut HindsightConfig) + Send + 'static) -> Self {
        self.configure.push(Box::new(f));
        self
    }

    pub async fn build(self) -> Result<TestHarness, HindsightError> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = |name: &str| temp_dir.path().join(name).to_string_lossy().into_owned();

        let mut config = HindsightConfig::default();
        config.storage.database_path = path("hindsight.db");
        config.cache.cache_dir = path("cache");
        config.research.scratch_dir = path("scratch");
        config.research.allowed_private_ips = vec!["127.0.0.1".to_string()];
        config.trigger.state_dir = path("sessions");
        config.trigger.hint_log_path = path("hints.jsonl");
        for f in self.configure {
            f(&mut config);
        }

        let db = Database::open(&config.storage.database_path, &config.storage).await?;
        let embedder = if self.without_embedder {
            None
        } else {
            Some(self.embedder.unwrap_or_else(|| Arc::new(MockEmbedder::new())))
        };
        let clock = Arc::new(ManualClock::fixed());
        let memory = MemoryService::new(
            db.clone(),
            embedder.clone().map(|e| e as Arc<dyn Embedder>),
            config.memory.clone(),
        )
        .with_clock(clock.clone());

        Ok(TestHarness {
            config,
            db,
            embedder,
            fetcher: self.fetcher.unwrap_or_default(),
            clock,
            memory,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete engine over temporary storage.
pub struct TestHarness {
    pub config: HindsightConfig,
    pub db: Database,
    pub embedder: Option<Arc<MockEmbedder>>,
    pub fetcher: Arc<MockFetcher>,
    pub clock: Arc<ManualClock>,
    pub memory: MemoryService,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default mocks.
    pub async fn new() -> Result<Self, HindsightError> {
        Self::builder().build().await
    }

    pub fn temp_path(&self) -> &std::path::Path {
        self._temp_dir.path()
    }

    pub async fn cache(&self) -> Result<TtlCache, HindsightError> {
        Ok(TtlCache::from_config(&self.config.cache)
            .await?
            .with_clock(self.clock.clone()))
    }

    pub fn research(&self) -> ResearchPipeline {
        ResearchPipeline::new(
            self.fetcher.clone() as Arc<dyn Fetcher>,
            self.memory.clone(),
            self.config.research.clone(),
        )
    }

    pub fn orchestrator(&self) -> Result<InjectionOrchestrator, HindsightError> {
        Ok(InjectionOrchestrator::new(self.memory.clone(), &self.config.trigger)?
            .with_clock(self.clock.clone()))
    }
}
