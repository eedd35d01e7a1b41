// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory of JSON cache records with read-time TTL.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hindsight_config::model::CacheConfig;
use hindsight_core::recording::record_cache_lookup;
use hindsight_core::{Clock, HindsightError, SystemClock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::key::CacheKey;

const ENTRY_EXT: &str = "json";
const TEMP_EXT: &str = "tmp";

/// Temp files younger than this may belong to an in-flight `set`.
const TEMP_GRACE: Duration = Duration::from_secs(60);

/// On-disk record: write time in epoch seconds plus the cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub timestamp: f64,
    pub result: Value,
}

/// File-backed key/value cache.
///
/// Writes go to a unique temp file that is renamed over the entry, so
/// readers see either the old record or the new one. Unreadable records are
/// misses.
#[derive(Clone)]
pub struct TtlCache {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    /// Open (and create if needed) a cache rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, HindsightError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            clock: Arc::new(SystemClock),
        })
    }

    pub async fn from_config(config: &CacheConfig) -> Result<Self, HindsightError> {
        Self::open(&config.cache_dir).await
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.{ENTRY_EXT}"))
    }

    fn now_secs(&self) -> f64 {
        epoch_secs(self.clock.now())
    }

    /// Look up `key`, treating records older than `ttl` as absent.
    ///
    /// An expired record is deleted. A corrupt record is a miss and is left
    /// for the next `set` to overwrite.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey, ttl: Duration) -> Option<T> {
        let path = self.entry_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                record_cache_lookup("miss");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed");
                record_cache_lookup("error");
                return None;
            }
        };

        let record: CacheRecord = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                debug!(key = %key, error = %e, "corrupt cache record");
                record_cache_lookup("corrupt");
                return None;
            }
        };

        let age = self.now_secs() - record.timestamp;
        if age > ttl.as_secs_f64() {
            debug!(key = %key, age_secs = age, "cache record expired");
            if let Err(e) = remove_if_exists(&path).await {
                warn!(key = %key, error = %e, "failed to delete expired cache record");
            }
            record_cache_lookup("expired");
            return None;
        }

        match serde_json::from_value(record.result) {
            Ok(value) => {
                record_cache_lookup("hit");
                Some(value)
            }
            Err(e) => {
                debug!(key = %key, error = %e, "cached value has unexpected shape");
                record_cache_lookup("corrupt");
                None
            }
        }
    }

    /// Store `value` under `key`, replacing any previous record.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey,
        value: &T,
    ) -> Result<(), HindsightError> {
        let record = CacheRecord {
            timestamp: self.now_secs(),
            result: serde_json::to_value(value)?,
        };
        let bytes = serde_json::to_vec(&record)?;
        let tmp = self
            .dir
            .join(format!("{key}.{}.{TEMP_EXT}", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.entry_path(key)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Delete the record for `key`. Returns whether one existed.
    pub async fn invalidate(&self, key: &CacheKey) -> Result<bool, HindsightError> {
        Ok(remove_if_exists(&self.entry_path(key)).await?)
    }

    /// Remove records older than `max_age`, corrupt records, and abandoned
    /// temp files. Returns the number of files removed.
    ///
    /// Safe to run while other processes read and write the cache.
    pub async fn sweep(&self, max_age: Duration) -> Result<usize, HindsightError> {
        let now = self.clock.now();
        let now_secs = epoch_secs(now);
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let stale = match path.extension().and_then(|e| e.to_str()) {
                Some(ENTRY_EXT) => match tokio::fs::read(&path).await {
                    Ok(bytes) => match serde_json::from_slice::<CacheRecord>(&bytes) {
                        Ok(record) => now_secs - record.timestamp > max_age.as_secs_f64(),
                        Err(_) => true,
                    },
                    Err(_) => false,
                },
                Some(TEMP_EXT) => match entry.metadata().await.and_then(|m| m.modified()) {
                    Ok(modified) => {
                        let written: DateTime<Utc> = modified.into();
                        (now - written).to_std().is_ok_and(|age| age > TEMP_GRACE)
                    }
                    Err(_) => false,
                },
                _ => false,
            };

            if stale && remove_if_exists(&path).await? {
                removed += 1;
            }
        }

        debug!(dir = %self.dir.display(), removed, "cache sweep complete");
        Ok(removed)
    }
}

fn epoch_secs(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64 / 1000.0
}

async fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;

    struct StepClock(Mutex<DateTime<Utc>>);

    impl StepClock {
        fn at(ts: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(ts)))
        }

        fn advance(&self, secs: i64) {
            let mut now = self.0.lock().unwrap();
            *now += chrono::Duration::seconds(secs);
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    async fn cache_at(
        dir: &tempfile::TempDir,
        start: DateTime<Utc>,
    ) -> (TtlCache, Arc<StepClock>) {
        let clock = StepClock::at(start);
        let cache = TtlCache::open(dir.path()).await.unwrap().with_clock(clock.clone());
        (cache, clock)
    }

    fn key(name: &str) -> CacheKey {
        CacheKey::builder("test").arg(name).build()
    }

    #[tokio::test]
    async fn entry_fresh_at_t_plus_30_and_expired_at_t_plus_61() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, clock) = cache_at(&dir, t0()).await;
        let k = key("a");
        cache.set(&k, &"value").await.unwrap();

        clock.advance(30);
        let got: Option<String> = cache.get(&k, Duration::from_secs(60)).await;
        assert_eq!(got.as_deref(), Some("value"));

        clock.advance(31);
        let got: Option<String> = cache.get(&k, Duration::from_secs(60)).await;
        assert!(got.is_none());
        assert!(!cache.entry_path(&k).exists());
    }

    #[tokio::test]
    async fn ttl_is_chosen_by_the_reader() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, clock) = cache_at(&dir, t0()).await;
        let k = key("b");
        cache.set(&k, &42_u32).await.unwrap();
        clock.advance(120);

        let long: Option<u32> = cache.get(&k, Duration::from_secs(3600)).await;
        assert_eq!(long, Some(42));
        let short: Option<u32> = cache.get(&k, Duration::from_secs(60)).await;
        assert_eq!(short, None);
    }

    #[tokio::test]
    async fn corrupt_record_is_a_miss_and_overwritten_by_set() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache_at(&dir, t0()).await;
        let k = key("c");
        std::fs::write(cache.entry_path(&k), b"{not json").unwrap();

        let got: Option<String> = cache.get(&k, Duration::from_secs(60)).await;
        assert!(got.is_none());

        cache.set(&k, &"fresh").await.unwrap();
        let got: Option<String> = cache.get(&k, Duration::from_secs(60)).await;
        assert_eq!(got.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn record_format_is_timestamp_and_result() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache_at(&dir, t0()).await;
        let k = key("d");
        cache.set(&k, &vec![1, 2]).await.unwrap();

        let raw: Value =
            serde_json::from_slice(&std::fs::read(cache.entry_path(&k)).unwrap()).unwrap();
        assert_eq!(raw["timestamp"].as_f64(), Some(epoch_secs(t0())));
        assert_eq!(raw["result"], serde_json::json!([1, 2]));
    }

    #[tokio::test]
    async fn invalidate_reports_whether_entry_existed() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache_at(&dir, t0()).await;
        let k = key("e");
        cache.set(&k, &true).await.unwrap();
        assert!(cache.invalidate(&k).await.unwrap());
        assert!(!cache.invalidate(&k).await.unwrap());
    }

    #[tokio::test]
    async fn sweep_removes_old_corrupt_and_abandoned_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, clock) = cache_at(&dir, Utc::now()).await;
        cache.set(&key("old"), &1).await.unwrap();
        clock.advance(7200);
        cache.set(&key("new"), &2).await.unwrap();
        std::fs::write(cache.entry_path(&key("bad")), b"garbage").unwrap();
        std::fs::write(dir.path().join("abandoned.1234.tmp"), b"partial").unwrap();
        std::fs::write(dir.path().join("README"), b"keep").unwrap();

        let removed = cache.sweep(Duration::from_secs(3600)).await.unwrap();
        assert_eq!(removed, 3);

        let kept: Option<i32> = cache.get(&key("new"), Duration::from_secs(3600)).await;
        assert_eq!(kept, Some(2));
        assert!(dir.path().join("README").exists());
    }
}
