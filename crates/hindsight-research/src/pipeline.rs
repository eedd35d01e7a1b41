// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fetch a source, keep a short insight, discard the rest.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hindsight_config::model::ResearchConfig;
use hindsight_core::recording::{record_degraded, record_research};
use hindsight_core::types::truncate_chars;
use hindsight_core::{Clock, Fetcher, HindsightError, SystemClock};
use hindsight_memory::{MemoryCategory, MemoryService, Metadata, MetadataValue, Scope};
use tracing::{debug, info, warn};

use crate::artifact::{sweep_stale_artifacts, RawArtifact};
use crate::extract::extract_relevant;

/// Outcome of one research call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResearchReport {
    /// Query-relevant excerpts, empty when nothing matched or the fetch failed.
    pub extracted: String,
    /// Id of the memory the summary was saved under, if any.
    pub memory_id: Option<String>,
    /// Whether the source was cut at the fetch cap.
    pub source_truncated: bool,
}

/// Ephemeral research: raw content lives in the scratch directory only for
/// the duration of [`ResearchPipeline::research`].
pub struct ResearchPipeline {
    fetcher: Arc<dyn Fetcher>,
    memory: MemoryService,
    config: ResearchConfig,
    clock: Arc<dyn Clock>,
}

impl ResearchPipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>, memory: MemoryService, config: ResearchConfig) -> Self {
        Self {
            fetcher,
            memory,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn scratch_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.scratch_dir)
    }

    /// Research `query` in `source` and save a summary into `scope`.
    ///
    /// Transport and data failures yield an empty report. Security refusals
    /// (private address, unsupported scheme) propagate. No raw artifact
    /// written by this call survives its return.
    pub async fn research(
        &self,
        source: &str,
        query: &str,
        scope: &Scope,
    ) -> Result<ResearchReport, HindsightError> {
        let result = self.run(source, query, scope).await;
        self.sweep_stale().await;

        match result {
            Ok(report) => {
                let outcome = if report.extracted.is_empty() {
                    "no-match"
                } else {
                    "extracted"
                };
                record_research(outcome);
                Ok(report)
            }
            Err(e) if e.is_degradable() => {
                warn!(source = %source, error = %e, "research degraded to empty result");
                record_degraded("research");
                record_research("failed");
                Ok(ResearchReport::default())
            }
            Err(e) => {
                record_research("refused");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        source: &str,
        query: &str,
        scope: &Scope,
    ) -> Result<ResearchReport, HindsightError> {
        let doc = self.fetcher.fetch(source, self.config.max_fetch_chars).await?;
        let artifact = RawArtifact::write(&self.scratch_dir(), &doc.content).await?;
        let source_truncated = doc.truncated;
        drop(doc);

        let raw = artifact.read().await?;
        let extracted = extract_relevant(
            &raw,
            query,
            self.config.context_lines,
            self.config.max_extract_chars,
        );
        drop(raw);
        artifact.discard().await?;

        let mut report = ResearchReport {
            extracted,
            memory_id: None,
            source_truncated,
        };
        if report.extracted.is_empty() {
            debug!(source = %source, query = %query, "no relevant excerpts");
            return Ok(report);
        }

        let summary = truncate_chars(&report.extracted, self.config.summary_chars).0;
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), MetadataValue::Text(format!("research:{source}")));
        metadata.insert("query".into(), MetadataValue::Text(query.to_string()));

        match self
            .memory
            .save(scope, MemoryCategory::Discovery, summary, metadata)
            .await
        {
            Ok(saved) => report.memory_id = Some(saved.id),
            Err(e) if e.is_degradable() => {
                warn!(source = %source, error = %e, "research summary not saved");
            }
            Err(e) => return Err(e),
        }

        info!(
            source = %source,
            excerpt_chars = report.extracted.chars().count(),
            saved = report.memory_id.is_some(),
            "research complete"
        );
        Ok(report)
    }

    async fn sweep_stale(&self) {
        let max_age = Duration::from_secs(self.config.stale_artifact_secs);
        match sweep_stale_artifacts(&self.scratch_dir(), max_age, self.clock.now()).await {
            Ok(0) => {}
            Ok(n) => debug!(removed = n, "swept stale research artifacts"),
            Err(e) => warn!(error = %e, "stale artifact sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use hindsight_config::model::MemoryConfig;
    use hindsight_core::{AdapterType, FetchedDocument, HealthStatus, PluginAdapter};
    use hindsight_storage::Database;

    use super::*;

    enum Behaviour {
        Serve(String),
        Fail,
        Refuse,
    }

    struct StaticFetcher(Behaviour);

    #[async_trait]
    impl PluginAdapter for StaticFetcher {
        fn name(&self) -> &str {
            "static"
        }

        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::Fetcher
        }

        async fn health_check(&self) -> Result<HealthStatus, HindsightError> {
            Ok(HealthStatus::Healthy)
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(
            &self,
            source: &str,
            max_chars: usize,
        ) -> Result<FetchedDocument, HindsightError> {
            match &self.0 {
                Behaviour::Serve(body) => {
                    let (content, truncated) = truncate_chars(body, max_chars);
                    Ok(FetchedDocument {
                        source: source.to_string(),
                        content: content.to_string(),
                        truncated,
                    })
                }
                Behaviour::Fail => Err(HindsightError::fetch("connection reset")),
                Behaviour::Refuse => Err(HindsightError::Security("private address".into())),
            }
        }
    }

    const DOC: &str = "intro\nSQLite WAL lets readers proceed during writes.\noutro\n\
                       unrelated\nmore unrelated\nfooter";

    async fn pipeline(
        behaviour: Behaviour,
        scratch: &std::path::Path,
    ) -> (ResearchPipeline, MemoryService) {
        let db = Database::open_in_memory().await.unwrap();
        let memory = MemoryService::new(db, None, MemoryConfig::default());
        let config = ResearchConfig {
            scratch_dir: scratch.to_string_lossy().into_owned(),
            context_lines: 1,
            summary_chars: 20,
            ..ResearchConfig::default()
        };
        let pipeline =
            ResearchPipeline::new(Arc::new(StaticFetcher(behaviour)), memory.clone(), config);
        (pipeline, memory)
    }

    fn scratch_is_empty(dir: &std::path::Path) -> bool {
        std::fs::read_dir(dir).map_or(true, |mut d| d.next().is_none())
    }

    fn scope() -> Scope {
        Scope::Project("atlas".into())
    }

    #[tokio::test]
    async fn match_saves_bounded_summary_and_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, memory) = pipeline(Behaviour::Serve(DOC.into()), dir.path()).await;

        let report = pipeline
            .research("https://example.com/wal", "wal readers", &scope())
            .await
            .unwrap();
        assert_eq!(
            report.extracted,
            "intro\nSQLite WAL lets readers proceed during writes.\noutro"
        );
        assert!(scratch_is_empty(dir.path()));

        let id = report.memory_id.unwrap();
        let entry = memory.get(&id).await.unwrap().unwrap();
        assert_eq!(entry.content.chars().count(), 20);
        assert_eq!(entry.category, MemoryCategory::Discovery);
        assert_eq!(
            entry.metadata.get("source"),
            Some(&MetadataValue::Text("research:https://example.com/wal".into()))
        );
    }

    #[tokio::test]
    async fn no_match_returns_empty_and_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, memory) = pipeline(Behaviour::Serve(DOC.into()), dir.path()).await;

        let report = pipeline
            .research("notes.txt", "postgres", &scope())
            .await
            .unwrap();
        assert_eq!(report, ResearchReport::default());
        assert!(scratch_is_empty(dir.path()));
        assert_eq!(memory.stats().await.unwrap().memories, 0);
    }

    #[tokio::test]
    async fn fetch_failure_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(Behaviour::Fail, dir.path()).await;
        let report = pipeline
            .research("https://example.com", "wal", &scope())
            .await
            .unwrap();
        assert!(report.extracted.is_empty());
        assert!(scratch_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn security_refusal_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(Behaviour::Refuse, dir.path()).await;
        let err = pipeline
            .research("http://10.0.0.1", "wal", &scope())
            .await
            .unwrap_err();
        assert!(matches!(err, HindsightError::Security(_)));
    }

    #[tokio::test]
    async fn stale_artifacts_from_earlier_runs_are_swept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("raw-crashed.txt"), "left behind").unwrap();
        let (pipeline, _) = pipeline(Behaviour::Serve(DOC.into()), dir.path()).await;

        struct Later;
        impl Clock for Later {
            fn now(&self) -> chrono::DateTime<chrono::Utc> {
                chrono::Utc::now() + chrono::Duration::hours(2)
            }
        }
        let pipeline = pipeline.with_clock(Arc::new(Later));

        pipeline.research("doc", "wal", &scope()).await.unwrap();
        assert!(scratch_is_empty(dir.path()));
    }
}
