// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line-oriented log of emitted and suppressed hints.
//!
//! Best effort: corrupt lines are skipped and the file is compacted to a
//! bounded tail once it grows past a multiple of the breaker window.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hindsight_core::types::truncate_chars;
use hindsight_core::HindsightError;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::rules::TriggerCategory;

/// Compaction triggers at this many times the retained tail.
const COMPACT_FACTOR: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintRecord {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub category: TriggerCategory,
    /// Hint text, truncated.
    pub content: String,
    #[serde(default)]
    pub suppressed: bool,
}

#[derive(Debug, Clone)]
pub struct HintLog {
    path: PathBuf,
    max_chars: usize,
    retain: usize,
}

impl HintLog {
    /// `max_chars` caps stored content; `retain` is the tail kept on compaction.
    pub fn new(path: impl Into<PathBuf>, max_chars: usize, retain: usize) -> Self {
        Self {
            path: path.into(),
            max_chars,
            retain: retain.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate hint text the way it is stored.
    pub fn clip<'a>(&self, content: &'a str) -> &'a str {
        truncate_chars(content, self.max_chars).0
    }

    pub async fn append(&self, record: &HintRecord) -> Result<(), HindsightError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut record = record.clone();
        record.content = self.clip(&record.content).to_string();
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// The last `limit` parseable records, oldest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<HintRecord>, HindsightError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        let records: Vec<HintRecord> = text
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let skip = records.len().saturating_sub(limit);
        Ok(records.into_iter().skip(skip).collect())
    }

    /// Rewrite the log to its last `retain` records once it holds more than
    /// `COMPACT_FACTOR * retain` lines. Returns whether it was rewritten.
    pub async fn compact(&self) -> Result<bool, HindsightError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let lines = text.lines().count();
        if lines <= COMPACT_FACTOR * self.retain {
            return Ok(false);
        }

        let tail = self.recent(self.retain).await?;
        let mut out = String::new();
        for record in &tail {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        let tmp = self
            .path
            .with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, out).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(path = %self.path.display(), before = lines, after = tail.len(), "hint log compacted");
        Ok(true)
    }
}
