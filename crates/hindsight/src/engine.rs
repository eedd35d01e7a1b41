// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wires the memory service and its collaborators from configuration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use hindsight_cache::{CachingEmbedder, TtlCache};
use hindsight_config::model::HindsightConfig;
use hindsight_core::{Embedder, HindsightError};
use hindsight_memory::{HttpEmbedder, MemoryService, Scope};
use hindsight_research::{ResearchPipeline, SourceFetcher};
use hindsight_storage::Database;
use hindsight_trigger::InjectionOrchestrator;

/// Everything a subcommand needs, opened once per process.
pub struct Engine {
    pub config: HindsightConfig,
    pub db: Database,
    pub embedder: Option<Arc<dyn Embedder>>,
    pub memory: MemoryService,
}

impl Engine {
    pub async fn open(config: HindsightConfig) -> Result<Self, HindsightError> {
        let db = Database::open(&config.storage.database_path, &config.storage).await?;
        let embedder = build_embedder(&config).await?;
        let memory = MemoryService::new(db.clone(), embedder.clone(), config.memory.clone())
            .with_dimensions(config.embedding.dimensions);
        Ok(Self {
            config,
            db,
            embedder,
            memory,
        })
    }

    pub fn research(&self) -> Result<ResearchPipeline, HindsightError> {
        let fetcher = SourceFetcher::new(&self.config.research)?;
        Ok(ResearchPipeline::new(
            Arc::new(fetcher),
            self.memory.clone(),
            self.config.research.clone(),
        ))
    }

    pub fn orchestrator(&self) -> Result<InjectionOrchestrator, HindsightError> {
        InjectionOrchestrator::new(self.memory.clone(), &self.config.trigger)
    }

    pub async fn cache(&self) -> Result<TtlCache, HindsightError> {
        TtlCache::from_config(&self.config.cache).await
    }
}

/// HTTP embedder behind the TTL cache. A cache directory that cannot be
/// created only costs the cache, not the embedder.
async fn build_embedder(
    config: &HindsightConfig,
) -> Result<Option<Arc<dyn Embedder>>, HindsightError> {
    if !config.embedding.enabled {
        debug!("embedding disabled, memories will be stored pending");
        return Ok(None);
    }

    let http: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(&config.embedding)?);
    match TtlCache::from_config(&config.cache).await {
        Ok(cache) => Ok(Some(Arc::new(CachingEmbedder::new(
            http,
            cache,
            config.embedding.model.clone(),
            Duration::from_secs(config.cache.embedding_ttl_secs),
        )))),
        Err(e) => {
            warn!(error = %e, dir = %config.cache.cache_dir, "embedding cache unavailable");
            Ok(Some(http))
        }
    }
}

/// An explicit `--scope` wins; otherwise the scope comes from `cwd`.
pub fn resolve_scope(explicit: Option<&str>, cwd: &Path) -> Scope {
    match explicit {
        Some(name) => Scope::from(name),
        None => Scope::from_cwd(cwd),
    }
}
