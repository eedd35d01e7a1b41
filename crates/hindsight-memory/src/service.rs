// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fail-open memory operations: save, search, link and backfill.
//!
//! Transport and data errors from the embedder or the store are logged and
//! degrade to an empty result. Configuration and internal errors propagate.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use hindsight_config::model::MemoryConfig;
use hindsight_core::recording::{record_degraded, record_save, record_search};
use hindsight_core::{format_timestamp, Clock, Embedder, HindsightError, SystemClock};
use hindsight_security::redact;
use hindsight_storage::Database;
use tracing::{debug, info, warn};

use crate::graph::RelationshipGraph;
use crate::search::{compare_hits, rank};
use crate::store::MemoryStore;
use crate::types::{
    cosine_similarity, memory_id, BackfillReport, MemoryCategory, MemoryEntry, Metadata,
    MetadataValue, RelationshipEdge, SaveOutcome, SaveResult, Scope, SearchHit, SessionHit,
    SessionSummary, StoreStats,
};

/// Entry point for every memory read and write.
#[derive(Clone)]
pub struct MemoryService {
    store: MemoryStore,
    graph: RelationshipGraph,
    embedder: Option<Arc<dyn Embedder>>,
    clock: Arc<dyn Clock>,
    config: MemoryConfig,
    dimensions: Option<usize>,
}

impl MemoryService {
    /// Create a service over a migrated database.
    ///
    /// With `embedder = None` every save is stored pending and every search
    /// returns nothing.
    pub fn new(db: Database, embedder: Option<Arc<dyn Embedder>>, config: MemoryConfig) -> Self {
        Self {
            store: MemoryStore::new(db.clone()),
            graph: RelationshipGraph::new(db),
            embedder,
            clock: Arc::new(SystemClock),
            config,
            dimensions: None,
        }
    }

    /// Replace the wall clock used for timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Pin the expected embedding dimensionality instead of learning it
    /// from the store.
    pub fn with_dimensions(mut self, dimensions: Option<usize>) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn graph(&self) -> &RelationshipGraph {
        &self.graph
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    fn now(&self) -> String {
        format_timestamp(self.clock.now())
    }

    /// Save a memory.
    ///
    /// Content is redacted before hashing, so two saves differing only in a
    /// private segment collapse into one entry. A repeat save bumps the usage
    /// counter instead of writing, and fills in the embedding if the stored
    /// row is still pending. If the embedder fails the entry is stored with no
    /// embedding and flagged for [`MemoryService::backfill`].
    pub async fn save(
        &self,
        scope: &Scope,
        category: MemoryCategory,
        content: &str,
        metadata: Metadata,
    ) -> Result<SaveResult, HindsightError> {
        let redacted = redact(content);
        let content = redacted.trim();
        if content.is_empty() {
            return Err(HindsightError::Serialization(
                "memory content is empty after redaction".to_string(),
            ));
        }

        let id = memory_id(scope, category, content);
        let now = self.now();

        if let Some(existing) = self.store.get_by_id(&id).await? {
            let usage_count = self
                .store
                .bump_usage(&id, &now)
                .await?
                .unwrap_or(existing.usage_count + 1);
            let mut embedded = !existing.embedding.is_empty();
            if !embedded || existing.embedding_pending {
                if let Some(vector) = self.embed_for_storage(content).await? {
                    self.store.set_embedding(&id, &vector).await?;
                    embedded = true;
                    debug!(id = %id, "pending embedding filled on merge");
                }
            }
            debug!(id = %id, usage_count, "memory already stored, bumped usage");
            record_save(SaveOutcome::Merged.as_str());
            return Ok(SaveResult {
                id,
                outcome: SaveOutcome::Merged,
                usage_count,
                embedded,
            });
        }

        let embedding = self.embed_for_storage(content).await?.unwrap_or_default();
        let embedded = !embedding.is_empty();
        let metadata = metadata
            .into_iter()
            .map(|(k, v)| match v {
                MetadataValue::Text(text) => (k, MetadataValue::Text(redact(&text))),
                other => (k, other),
            })
            .collect();

        let entry = MemoryEntry {
            id: id.clone(),
            scope: scope.clone(),
            category,
            content: content.to_string(),
            embedding,
            metadata,
            usage_count: 1,
            retrieved_count: 0,
            embedding_pending: !embedded,
            created_at: now.clone(),
            updated_at: now,
        };

        let usage_count = self.store.insert_or_bump(&entry).await?;
        let outcome = if usage_count == 1 {
            SaveOutcome::Created
        } else {
            SaveOutcome::Merged
        };
        info!(id = %id, scope = %scope, category = %category, embedded, "memory saved");
        record_save(outcome.as_str());

        Ok(SaveResult {
            id,
            outcome,
            usage_count,
            embedded,
        })
    }

    /// Embed `text`, turning degradable failures and dimension drift into `None`.
    async fn embed_for_storage(&self, text: &str) -> Result<Option<Vec<f32>>, HindsightError> {
        let Some(vector) = self.embed_or_none(text).await? else {
            return Ok(None);
        };
        let expected = match self.dimensions {
            Some(dims) => Some(dims),
            None => self.store.expected_dimensions().await?,
        };
        match expected {
            Some(dims) if dims != vector.len() => {
                warn!(
                    expected = dims,
                    actual = vector.len(),
                    "embedding dimensionality differs from store, saving as pending"
                );
                Ok(None)
            }
            _ => Ok(Some(vector)),
        }
    }

    async fn embed_or_none(&self, text: &str) -> Result<Option<Vec<f32>>, HindsightError> {
        let Some(embedder) = &self.embedder else {
            return Ok(None);
        };
        match embedder.embed_text(text).await {
            Ok(vector) => Ok(Some(vector)),
            Err(e) if e.is_degradable() => {
                warn!(error = %e, "embedding unavailable");
                record_degraded("embed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Rank memories in `scope` by similarity to `query`.
    ///
    /// Returns an empty list when the embedder or the store is unavailable.
    /// `top_k = None` uses the configured default.
    pub async fn search(
        &self,
        scope: &Scope,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchHit>, HindsightError> {
        match self.try_search(scope, query, top_k.unwrap_or(self.config.top_k)).await {
            Ok(hits) => Ok(hits),
            Err(e) if e.is_degradable() => {
                warn!(scope = %scope, error = %e, "search degraded to empty result");
                record_degraded("search");
                Ok(vec![])
            }
            Err(e) => Err(e),
        }
    }

    async fn try_search(
        &self,
        scope: &Scope,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, HindsightError> {
        let Some(embedder) = &self.embedder else {
            return Ok(vec![]);
        };
        if query.trim().is_empty() || top_k == 0 {
            return Ok(vec![]);
        }

        let query_vector = embedder.embed_text(query).await?;
        let candidates = self.store.embedded_in_scope(scope).await?;
        let considered = candidates.len();
        let mut hits = rank(
            &query_vector,
            candidates,
            self.config.similarity_threshold,
            top_k,
        );

        if self.config.link_boost && !hits.is_empty() && hits.len() < top_k {
            self.add_linked(scope, &query_vector, &mut hits, top_k).await?;
        }

        let ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
        if let Err(e) = self.store.record_retrieval(&ids).await {
            warn!(error = %e, "failed to record retrieval counts");
        }

        debug!(scope = %scope, considered, hits = hits.len(), "search complete");
        record_search(hits.len());
        Ok(hits)
    }

    /// Append neighbours of the top hit whose edge weight clears the
    /// configured minimum, until `top_k` is reached.
    async fn add_linked(
        &self,
        scope: &Scope,
        query_vector: &[f32],
        hits: &mut Vec<SearchHit>,
        top_k: usize,
    ) -> Result<(), HindsightError> {
        let neighbours = self
            .graph
            .weighted_neighbors(&hits[0].id, self.config.link_min_weight)
            .await?;
        let present: HashSet<String> = hits.iter().map(|h| h.id.clone()).collect();
        let wanted: Vec<String> = neighbours
            .into_iter()
            .map(|(id, _)| id)
            .filter(|id| !present.contains(id))
            .collect();
        if wanted.is_empty() {
            return Ok(());
        }

        let mut linked: Vec<SearchHit> = self
            .store
            .get_many(&wanted)
            .await?
            .into_iter()
            .filter(|entry| &entry.scope == scope)
            .map(|entry| SearchHit {
                similarity: cosine_similarity(query_vector, &entry.embedding),
                id: entry.id,
                content: entry.content,
                category: entry.category,
                updated_at: entry.updated_at,
                via_link: true,
            })
            .collect();
        linked.sort_by(compare_hits);

        let free = top_k.saturating_sub(hits.len());
        debug!(added = linked.len().min(free), "link boost");
        hits.extend(linked.into_iter().take(free));
        Ok(())
    }

    /// Append a relationship edge.
    pub async fn link(
        &self,
        source_id: &str,
        target_id: &str,
        relation_type: &str,
        weight: f64,
    ) -> Result<i64, HindsightError> {
        if !weight.is_finite() {
            return Err(HindsightError::Serialization(format!(
                "edge weight must be finite, got {weight}"
            )));
        }
        self.graph
            .link(&RelationshipEdge {
                source_id: source_id.to_string(),
                target_id: target_id.to_string(),
                relation_type: relation_type.to_string(),
                weight,
                created_at: self.now(),
            })
            .await
    }

    pub async fn neighbors(
        &self,
        id: &str,
        relation_type: Option<&str>,
    ) -> Result<BTreeSet<String>, HindsightError> {
        self.graph.neighbors(id, relation_type).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<MemoryEntry>, HindsightError> {
        self.store.get_by_id(id).await
    }

    /// Exact scope + category lookup, including entries without embeddings.
    pub async fn list_by_scope_category(
        &self,
        scope: &Scope,
        category: Option<MemoryCategory>,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, HindsightError> {
        self.store.list_by_scope_category(scope, category, limit).await
    }

    /// Embed up to `limit` entries saved while the provider was down.
    ///
    /// Stops at the first provider failure; the rest stay pending.
    pub async fn backfill(&self, limit: usize) -> Result<BackfillReport, HindsightError> {
        let mut report = BackfillReport::default();
        let Some(embedder) = &self.embedder else {
            return Ok(report);
        };

        let pending = self.store.pending_embeddings(limit).await?;
        let total = pending.len();
        for (id, content) in pending {
            match embedder.embed_text(&content).await {
                Ok(vector) => {
                    self.store.set_embedding(&id, &vector).await?;
                    report.embedded += 1;
                }
                Err(e) if e.is_degradable() => {
                    warn!(error = %e, "backfill stopped, provider unavailable");
                    record_degraded("backfill");
                    report.failed = total - report.embedded;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        info!(embedded = report.embedded, failed = report.failed, "backfill complete");
        Ok(report)
    }

    /// Store a session summary. Summaries are never merged.
    pub async fn save_session_summary(
        &self,
        scope: &Scope,
        summary: &str,
    ) -> Result<String, HindsightError> {
        let summary = redact(summary).trim().to_string();
        if summary.is_empty() {
            return Err(HindsightError::Serialization(
                "session summary is empty after redaction".to_string(),
            ));
        }
        let id = uuid::Uuid::new_v4().to_string();
        let embedding = self.embed_for_storage(&summary).await?;
        self.store
            .insert_session(&SessionSummary {
                id: id.clone(),
                scope: scope.clone(),
                summary,
                embedding,
                created_at: self.now(),
            })
            .await?;
        info!(id = %id, scope = %scope, "session summary saved");
        Ok(id)
    }

    /// Rank session summaries in `scope`. Fails open like [`MemoryService::search`].
    pub async fn search_sessions(
        &self,
        scope: &Scope,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SessionHit>, HindsightError> {
        match self.try_search_sessions(scope, query, top_k).await {
            Ok(hits) => Ok(hits),
            Err(e) if e.is_degradable() => {
                warn!(scope = %scope, error = %e, "session search degraded to empty result");
                record_degraded("search_sessions");
                Ok(vec![])
            }
            Err(e) => Err(e),
        }
    }

    async fn try_search_sessions(
        &self,
        scope: &Scope,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SessionHit>, HindsightError> {
        let Some(embedder) = &self.embedder else {
            return Ok(vec![]);
        };
        if query.trim().is_empty() {
            return Ok(vec![]);
        }
        let query_vector = embedder.embed_text(query).await?;
        let mut hits: Vec<SessionHit> = self
            .store
            .list_sessions(scope, usize::MAX)
            .await?
            .into_iter()
            .filter_map(|s| {
                let embedding = s.embedding?;
                if embedding.len() != query_vector.len() {
                    return None;
                }
                let similarity = cosine_similarity(&query_vector, &embedding);
                (similarity >= self.config.similarity_threshold).then_some(SessionHit {
                    id: s.id,
                    summary: s.summary,
                    similarity,
                    created_at: s.created_at,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    pub async fn stats(&self) -> Result<StoreStats, HindsightError> {
        self.store.stats().await
    }
}
