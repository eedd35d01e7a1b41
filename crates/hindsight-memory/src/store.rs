// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed memory store with vector BLOB storage.
//!
//! Embeddings are stored as little-endian f32 BLOBs; an empty embedding is
//! stored as NULL together with `embedding_pending = 1`.

use std::str::FromStr;

use hindsight_core::HindsightError;
use hindsight_storage::{map_tr_err, Database};
use rusqlite::{params, OptionalExtension, Row};

use crate::types::{
    blob_to_vec, vec_to_blob, Candidate, MemoryCategory, MemoryEntry, Metadata, Scope,
    SessionSummary, StoreStats,
};

const ENTRY_COLUMNS: &str = "id, scope, category, content, embedding, metadata, usage_count, \
     retrieved_count, embedding_pending, created_at, updated_at";

/// Persistent store for memories and session summaries.
#[derive(Clone)]
pub struct MemoryStore {
    db: Database,
}

impl MemoryStore {
    /// Creates a new MemoryStore over a migrated database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Insert an entry, or bump `usage_count` if its id already exists.
    ///
    /// A merge fills in a missing embedding but never replaces one. Returns
    /// the usage count after the write; `1` means a new row was created.
    pub async fn insert_or_bump(&self, entry: &MemoryEntry) -> Result<i64, HindsightError> {
        let id = entry.id.clone();
        let scope = entry.scope.as_str().to_string();
        let category = entry.category.as_str();
        let content = entry.content.clone();
        let embedding = (!entry.embedding.is_empty()).then(|| vec_to_blob(&entry.embedding));
        let metadata = serde_json::to_string(&entry.metadata)?;
        let pending = entry.embedding_pending;
        let created_at = entry.created_at.clone();
        let updated_at = entry.updated_at.clone();

        self.db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    "INSERT INTO memories (id, scope, category, content, embedding, metadata, \
                         usage_count, retrieved_count, embedding_pending, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, 0, ?7, ?8, ?9)
                     ON CONFLICT(id) DO UPDATE SET
                         usage_count = memories.usage_count + 1,
                         updated_at = excluded.updated_at,
                         embedding_pending = CASE
                             WHEN memories.embedding IS NULL AND excluded.embedding IS NOT NULL THEN 0
                             ELSE memories.embedding_pending END,
                         embedding = COALESCE(memories.embedding, excluded.embedding)
                     RETURNING usage_count",
                    params![id, scope, category, content, embedding, metadata, pending, created_at, updated_at],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_tr_err)
    }

    /// Increment `usage_count` for an existing id.
    ///
    /// Returns the new count, or `None` if no such entry exists.
    pub async fn bump_usage(
        &self,
        id: &str,
        updated_at: &str,
    ) -> Result<Option<i64>, HindsightError> {
        let id = id.to_string();
        let updated_at = updated_at.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    "UPDATE memories SET usage_count = usage_count + 1, updated_at = ?2
                     WHERE id = ?1 RETURNING usage_count",
                    params![id, updated_at],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Get a memory by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<MemoryEntry>, HindsightError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM memories WHERE id = ?1");
                conn.query_row(&sql, params![id], row_to_entry).optional()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Get several memories by ID. Unknown ids are skipped.
    pub async fn get_many(&self, ids: &[String]) -> Result<Vec<MemoryEntry>, HindsightError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let ids = ids.to_vec();
        self.db
            .connection()
            .call(move |conn| {
                let placeholders = vec!["?"; ids.len()].join(", ");
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM memories WHERE id IN ({placeholders})"
                );
                let mut stmt = conn.prepare(&sql)?;
                let entries = stmt
                    .query_map(rusqlite::params_from_iter(ids.iter()), row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(map_tr_err)
    }

    /// List entries in a scope, optionally narrowed to one category.
    ///
    /// Includes entries without an embedding. Newest first.
    pub async fn list_by_scope_category(
        &self,
        scope: &Scope,
        category: Option<MemoryCategory>,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, HindsightError> {
        let scope = scope.as_str().to_string();
        let category = category.map(|c| c.as_str());
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db
            .connection()
            .call(move |conn| {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM memories
                     WHERE scope = ?1 AND (?2 IS NULL OR category = ?2)
                     ORDER BY updated_at DESC LIMIT ?3"
                );
                let mut stmt = conn.prepare(&sql)?;
                let entries = stmt
                    .query_map(params![scope, category, limit], row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Every entry in `scope` that has an embedding.
    pub async fn embedded_in_scope(&self, scope: &Scope) -> Result<Vec<Candidate>, HindsightError> {
        let scope = scope.as_str().to_string();
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, content, category, updated_at, embedding FROM memories
                     WHERE scope = ?1 AND embedding IS NOT NULL",
                )?;
                let candidates = stmt
                    .query_map(params![scope], |row| {
                        let blob: Vec<u8> = row.get(4)?;
                        Ok(Candidate {
                            id: row.get(0)?,
                            content: row.get(1)?,
                            category: parse_category(row, 2)?,
                            updated_at: row.get(3)?,
                            embedding: blob_to_vec(&blob),
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(candidates)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Increment `retrieved_count` for each id in one transaction.
    pub async fn record_retrieval(&self, ids: &[String]) -> Result<(), HindsightError> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids = ids.to_vec();
        self.db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "UPDATE memories SET retrieved_count = retrieved_count + 1 WHERE id = ?1",
                    )?;
                    for id in &ids {
                        stmt.execute(params![id])?;
                    }
                }
                tx.commit()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Oldest entries still waiting for an embedding.
    pub async fn pending_embeddings(
        &self,
        limit: usize,
    ) -> Result<Vec<(String, String)>, HindsightError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, content FROM memories WHERE embedding_pending = 1
                     ORDER BY created_at ASC LIMIT ?1",
                )?;
                let rows = stmt
                    .query_map(params![limit], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Store a computed embedding and clear the pending flag.
    pub async fn set_embedding(&self, id: &str, embedding: &[f32]) -> Result<(), HindsightError> {
        let id = id.to_string();
        let blob = vec_to_blob(embedding);
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE memories SET embedding = ?2, embedding_pending = 0 WHERE id = ?1",
                    params![id, blob],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Dimensionality of stored embeddings, taken from any embedded row.
    pub async fn expected_dimensions(&self) -> Result<Option<usize>, HindsightError> {
        self.db
            .connection()
            .call(|conn| {
                conn.query_row(
                    "SELECT length(embedding) FROM memories WHERE embedding IS NOT NULL LIMIT 1",
                    [],
                    |row| row.get::<_, i64>(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
            .map(|bytes| bytes.map(|b| usize::try_from(b / 4).unwrap_or(0)))
    }

    /// Persist a session summary.
    pub async fn insert_session(&self, session: &SessionSummary) -> Result<(), HindsightError> {
        let id = session.id.clone();
        let scope = session.scope.as_str().to_string();
        let summary = session.summary.clone();
        let embedding = session
            .embedding
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(vec_to_blob);
        let created_at = session.created_at.clone();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sessions (id, scope, summary, embedding, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![id, scope, summary, embedding, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Session summaries in `scope`, newest first.
    pub async fn list_sessions(
        &self,
        scope: &Scope,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, HindsightError> {
        let scope = scope.as_str().to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, scope, summary, embedding, created_at FROM sessions
                     WHERE scope = ?1 ORDER BY created_at DESC LIMIT ?2",
                )?;
                let sessions = stmt
                    .query_map(params![scope, limit], |row| {
                        let blob: Option<Vec<u8>> = row.get(3)?;
                        Ok(SessionSummary {
                            id: row.get(0)?,
                            scope: Scope::from(row.get::<_, String>(1)?),
                            summary: row.get(2)?,
                            embedding: blob.map(|b| blob_to_vec(&b)),
                            created_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(sessions)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Row counts for diagnostics.
    pub async fn stats(&self) -> Result<StoreStats, HindsightError> {
        self.db
            .connection()
            .call(|conn| {
                conn.query_row(
                    "SELECT
                        (SELECT COUNT(*) FROM memories),
                        (SELECT COUNT(*) FROM memories WHERE embedding_pending = 1),
                        (SELECT COUNT(*) FROM relationships),
                        (SELECT COUNT(*) FROM sessions)",
                    [],
                    |row| {
                        Ok(StoreStats {
                            memories: row.get(0)?,
                            pending_embeddings: row.get(1)?,
                            relationships: row.get(2)?,
                            sessions: row.get(3)?,
                        })
                    },
                )
            })
            .await
            .map_err(map_tr_err)
    }
}

fn conversion_err(
    column: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_category(row: &Row<'_>, column: usize) -> rusqlite::Result<MemoryCategory> {
    let raw: String = row.get(column)?;
    MemoryCategory::from_str(&raw).map_err(|e| conversion_err(column, e))
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<MemoryEntry> {
    let blob: Option<Vec<u8>> = row.get(4)?;
    let metadata_json: String = row.get(5)?;
    let metadata: Metadata =
        serde_json::from_str(&metadata_json).map_err(|e| conversion_err(5, e))?;
    Ok(MemoryEntry {
        id: row.get(0)?,
        scope: Scope::from(row.get::<_, String>(1)?),
        category: parse_category(row, 2)?,
        content: row.get(3)?,
        embedding: blob.map(|b| blob_to_vec(&b)).unwrap_or_default(),
        metadata,
        usage_count: row.get(6)?,
        retrieved_count: row.get(7)?,
        embedding_pending: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
