// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scratch files holding raw fetched content for the length of one call.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use hindsight_core::HindsightError;
use tracing::{debug, warn};

const ARTIFACT_PREFIX: &str = "raw-";
const ARTIFACT_EXT: &str = "txt";

/// A raw-content file that is removed when the guard goes out of scope.
///
/// Call [`RawArtifact::discard`] to surface deletion errors; otherwise
/// `Drop` removes the file best-effort.
#[derive(Debug)]
pub struct RawArtifact {
    path: PathBuf,
    removed: bool,
}

impl RawArtifact {
    /// Write `content` to a fresh file under `scratch_dir`.
    pub async fn write(scratch_dir: &Path, content: &str) -> Result<Self, HindsightError> {
        tokio::fs::create_dir_all(scratch_dir).await?;
        let path = scratch_dir.join(format!(
            "{ARTIFACT_PREFIX}{}.{ARTIFACT_EXT}",
            uuid::Uuid::new_v4().simple()
        ));
        let guard = Self {
            path,
            removed: false,
        };
        tokio::fs::write(&guard.path, content).await?;
        debug!(path = %guard.path.display(), bytes = content.len(), "raw artifact written");
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> Result<String, HindsightError> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }

    /// Delete the file now.
    pub async fn discard(mut self) -> Result<(), HindsightError> {
        self.removed = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for RawArtifact {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to delete raw artifact");
            }
        }
    }
}

/// Delete artifacts in `scratch_dir` last modified more than `max_age`
/// before `now`. Returns how many were removed.
pub async fn sweep_stale_artifacts(
    scratch_dir: &Path,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Result<usize, HindsightError> {
    let mut entries = match tokio::fs::read_dir(scratch_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(ARTIFACT_PREFIX) {
            continue;
        }
        let Ok(modified) = entry.metadata().await.and_then(|m| m.modified()) else {
            continue;
        };
        let written: DateTime<Utc> = modified.into();
        if (now - written).to_std().is_ok_and(|age| age > max_age) {
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drop_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let artifact = RawArtifact::write(dir.path(), "raw body").await.unwrap();
            assert_eq!(artifact.read().await.unwrap(), "raw body");
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn discard_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = RawArtifact::write(dir.path(), "raw body").await.unwrap();
        let path = artifact.path().to_path_buf();
        artifact.discard().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn sweep_removes_only_old_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("raw-old.txt"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        let removed = sweep_stale_artifacts(dir.path(), Duration::from_secs(3600), Utc::now())
            .await
            .unwrap();
        assert_eq!(removed, 0);

        let later = Utc::now() + chrono::Duration::hours(2);
        let removed = sweep_stale_artifacts(dir.path(), Duration::from_secs(3600), later)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn sweep_of_missing_dir_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let removed = sweep_stale_artifacts(&missing, Duration::from_secs(1), Utc::now())
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }
}
