// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use hindsight_config::model::StorageConfig;
use hindsight_core::HindsightError;
use tracing::debug;

use crate::migrations::run_migrations;

/// Convert a tokio-rusqlite error into [`HindsightError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error) -> HindsightError {
    HindsightError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the engine's SQLite database.
///
/// Cloning is cheap; every clone talks to the same background thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database file, apply PRAGMAs and run migrations.
    ///
    /// The parent directory is created if missing.
    pub async fn open(path: &str, config: &StorageConfig) -> Result<Self, HindsightError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;
        let db = Self { conn };
        db.prepare(config.wal_mode, config.busy_timeout_ms).await?;
        debug!(path, wal = config.wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the full schema applied.
    pub async fn open_in_memory() -> Result<Self, HindsightError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| map_tr_err(e.into()))?;
        let db = Self { conn };
        db.prepare(false, 0).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool, busy_timeout_ms: u64) -> Result<(), HindsightError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    conn.pragma_update(None, "journal_mode", "WAL")?;
                    conn.pragma_update(None, "synchronous", "NORMAL")?;
                }
                conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))?;
                conn.pragma_update(None, "foreign_keys", "ON")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        let result = self
            .conn
            .call(|conn| -> Result<(), HindsightError> { run_migrations(conn) })
            .await;
        match result {
            Ok(()) => Ok(()),
            Err(tokio_rusqlite::Error::Error(e)) => Err(e),
            Err(e) => Err(HindsightError::Storage {
                source: Box::new(std::io::Error::other(e.to_string())),
            }),
        }
    }

    /// The underlying connection. Query modules call through `.call()`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Run `PRAGMA integrity_check` and return the reported problems.
    ///
    /// An empty vector means the database is healthy.
    pub async fn integrity_check(&self) -> Result<Vec<String>, HindsightError> {
        self.conn
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare("PRAGMA integrity_check")?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows.into_iter().filter(|r| r != "ok").collect())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint the WAL so the main file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), HindsightError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_names(db: &Database) -> Vec<String> {
        db.connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn in_memory_database_has_schema() {
        let db = Database::open_in_memory().await.unwrap();
        let names = table_names(&db).await;
        for table in ["memories", "relationships", "sessions"] {
            assert!(names.iter().any(|n| n == table), "missing {table}");
        }
    }

    #[tokio::test]
    async fn open_creates_parent_directory_and_is_reopenable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("hindsight.db");
        let path = path.to_str().unwrap().to_string();
        let config = StorageConfig::default();

        let db = Database::open(&path, &config).await.unwrap();
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO relationships (source_id, target_id, relation_type) VALUES ('a', 'b', 'x')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        db.checkpoint().await.unwrap();
        drop(db);

        // Migrations are idempotent on reopen.
        let db = Database::open(&path, &config).await.unwrap();
        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM relationships", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn fresh_database_passes_integrity_check() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(db.integrity_check().await.unwrap().is_empty());
    }
}
