// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only relationship graph over memory ids.
//!
//! Edges are advisory: endpoints are not validated, duplicates are allowed
//! and add weight, and cycles are fine.

use std::collections::BTreeSet;

use hindsight_core::HindsightError;
use hindsight_storage::{map_tr_err, Database};
use rusqlite::params;

use crate::types::RelationshipEdge;

/// Directed, weighted edges between memories.
#[derive(Clone)]
pub struct RelationshipGraph {
    db: Database,
}

impl RelationshipGraph {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append an edge. Returns its row id.
    pub async fn link(&self, edge: &RelationshipEdge) -> Result<i64, HindsightError> {
        let edge = edge.clone();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO relationships (source_id, target_id, relation_type, weight, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        edge.source_id,
                        edge.target_id,
                        edge.relation_type,
                        edge.weight,
                        edge.created_at
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Targets of edges leaving `id`, optionally restricted to one relation type.
    pub async fn neighbors(
        &self,
        id: &str,
        relation_type: Option<&str>,
    ) -> Result<BTreeSet<String>, HindsightError> {
        let id = id.to_string();
        let relation_type = relation_type.map(str::to_string);
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT DISTINCT target_id FROM relationships
                     WHERE source_id = ?1 AND (?2 IS NULL OR relation_type = ?2)",
                )?;
                let ids = stmt
                    .query_map(params![id, relation_type], |row| row.get(0))?
                    .collect::<Result<BTreeSet<String>, _>>()?;
                Ok(ids)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Targets of `id` whose summed edge weight reaches `min_weight`,
    /// heaviest first.
    pub async fn weighted_neighbors(
        &self,
        id: &str,
        min_weight: f64,
    ) -> Result<Vec<(String, f64)>, HindsightError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT target_id, SUM(weight) AS total FROM relationships
                     WHERE source_id = ?1 AND target_id != ?1
                     GROUP BY target_id HAVING total >= ?2
                     ORDER BY total DESC, target_id ASC",
                )?;
                let rows = stmt
                    .query_map(params![id, min_weight], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)
    }

    /// All edges leaving `id`, oldest first.
    pub async fn edges_from(&self, id: &str) -> Result<Vec<RelationshipEdge>, HindsightError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT source_id, target_id, relation_type, weight, created_at
                     FROM relationships WHERE source_id = ?1 ORDER BY id ASC",
                )?;
                let edges = stmt
                    .query_map(params![id], |row| {
                        Ok(RelationshipEdge {
                            source_id: row.get(0)?,
                            target_id: row.get(1)?,
                            relation_type: row.get(2)?,
                            weight: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(edges)
            })
            .await
            .map_err(map_tr_err)
    }
}
