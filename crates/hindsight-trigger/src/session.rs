// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session trigger state persisted between hook invocations.
//!
//! Every invocation is a fresh process, so turn counters and cooldown marks
//! live in `<state_dir>/<session>.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hindsight_core::HindsightError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::rules::{Cooldown, TriggerCategory};

/// Where the session sits after its latest turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing classified this turn.
    #[default]
    Idle,
    /// A rule matched but nothing was emitted.
    Classified,
    /// The matched category fired this turn, or fired earlier and is still
    /// cooling down.
    Cooldown,
}

/// When a category last fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Firing {
    pub turn: u64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    #[serde(default)]
    pub turn: u64,
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub last_fired: BTreeMap<TriggerCategory, Firing>,
}

impl SessionState {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            turn: 0,
            phase: Phase::Idle,
            last_fired: BTreeMap::new(),
        }
    }

    /// Count a new prompt.
    pub fn begin_turn(&mut self) {
        self.turn += 1;
    }

    /// Whether `category` fired too recently to fire again.
    ///
    /// `Turns(n)` blocks until `n` turns have passed since the firing turn;
    /// `Duration(d)` blocks until `d` has elapsed.
    pub fn is_cooling(
        &self,
        category: TriggerCategory,
        cooldown: Option<Cooldown>,
        now: DateTime<Utc>,
    ) -> bool {
        let (Some(cooldown), Some(fired)) = (cooldown, self.last_fired.get(&category)) else {
            return false;
        };
        match cooldown {
            Cooldown::Turns(n) => self.turn.saturating_sub(fired.turn) < u64::from(n),
            Cooldown::Duration(d) => (now - fired.at).to_std().map_or(true, |elapsed| elapsed < d),
        }
    }

    pub fn mark_fired(&mut self, category: TriggerCategory, now: DateTime<Utc>) {
        self.last_fired.insert(
            category,
            Firing {
                turn: self.turn,
                at: now,
            },
        );
        self.phase = Phase::Cooldown;
    }
}

/// Directory of session state files.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(session_id)))
    }

    /// Load state for `session_id`; a missing or unreadable file starts fresh.
    pub async fn load(&self, session_id: &str) -> SessionState {
        let path = self.path_for(session_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "cannot read session state");
                }
                return SessionState::new(session_id);
            }
        };
        match serde_json::from_slice::<SessionState>(&bytes) {
            Ok(state) if state.session_id == session_id => state,
            Ok(_) => SessionState::new(session_id),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt session state, starting fresh");
                SessionState::new(session_id)
            }
        }
    }

    pub async fn save(&self, state: &SessionState) -> Result<(), HindsightError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&state.session_id);
        let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, serde_json::to_vec(state)?).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Session ids become file names; anything unusual is hashed.
fn file_stem(session_id: &str) -> String {
    let safe = !session_id.is_empty()
        && session_id.len() <= 128
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if safe {
        session_id.to_string()
    } else {
        let digest = Sha256::digest(session_id.as_bytes());
        format!("h-{}", hex::encode(&digest[..16]))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn turn_cooldown_blocks_until_enough_turns_pass() {
        let mut state = SessionState::new("s");
        state.begin_turn();
        state.mark_fired(TriggerCategory::PastWork, t0());
        let cd = Some(Cooldown::Turns(3));

        state.begin_turn();
        assert!(state.is_cooling(TriggerCategory::PastWork, cd, t0()));
        state.begin_turn();
        assert!(state.is_cooling(TriggerCategory::PastWork, cd, t0()));
        state.begin_turn();
        assert!(!state.is_cooling(TriggerCategory::PastWork, cd, t0()));
    }

    #[test]
    fn duration_cooldown_uses_wall_clock() {
        let mut state = SessionState::new("s");
        state.mark_fired(TriggerCategory::Decision, t0());
        let cd = Some(Cooldown::Duration(Duration::from_secs(60)));

        let later = |s| t0() + chrono::Duration::seconds(s);
        assert!(state.is_cooling(TriggerCategory::Decision, cd, later(59)));
        assert!(!state.is_cooling(TriggerCategory::Decision, cd, later(60)));
    }

    #[test]
    fn cooldown_is_per_category() {
        let mut state = SessionState::new("s");
        state.mark_fired(TriggerCategory::Decision, t0());
        assert_eq!(state.phase, Phase::Cooldown);
        assert!(!state.is_cooling(
            TriggerCategory::Preference,
            Some(Cooldown::Turns(5)),
            t0()
        ));
        assert!(!state.is_cooling(TriggerCategory::Decision, None, t0()));
    }

    #[tokio::test]
    async fn state_survives_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"));
        let mut state = SessionState::new("abc-123");
        state.begin_turn();
        state.mark_fired(TriggerCategory::Setup, t0());
        store.save(&state).await.unwrap();

        assert_eq!(store.load("abc-123").await, state);
        assert_eq!(store.load("other").await, SessionState::new("other"));
    }

    #[tokio::test]
    async fn corrupt_state_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        std::fs::write(dir.path().join("s1.json"), b"{{{").unwrap();
        assert_eq!(store.load("s1").await, SessionState::new("s1"));
    }

    #[test]
    fn odd_session_ids_are_hashed() {
        assert_eq!(file_stem("abc_1-2"), "abc_1-2");
        let stem = file_stem("../../etc/passwd");
        assert!(stem.starts_with("h-"));
        assert_eq!(stem.len(), 34);
    }
}
