// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Suppresses hints that keep repeating within a short window.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hindsight_config::model::TriggerConfig;

use crate::hint_log::HintRecord;
use crate::rules::TriggerCategory;

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreaker {
    /// Prior emissions at which the next one is suppressed.
    pub threshold: usize,
    /// Log entries inspected.
    pub window: usize,
    pub window_age: Duration,
    /// Normalised Levenshtein similarity counted as a duplicate.
    pub similarity: f64,
}

impl CircuitBreaker {
    pub fn from_config(config: &TriggerConfig) -> Self {
        Self {
            threshold: config.breaker_threshold,
            window: config.breaker_window,
            window_age: Duration::from_secs(config.breaker_window_secs),
            similarity: config.breaker_similarity,
        }
    }

    /// Whether emitting `content` for `category` in `session_id` now would
    /// repeat a hint already emitted `threshold` times within the window.
    ///
    /// `history` is oldest first; suppressed records do not count.
    pub fn should_suppress(
        &self,
        history: &[HintRecord],
        session_id: &str,
        category: TriggerCategory,
        content: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let candidate = normalize(content);
        let start = history.len().saturating_sub(self.window);
        let repeats = history[start..]
            .iter()
            .filter(|r| !r.suppressed && r.session_id == session_id && r.category == category)
            .filter(|r| {
                (now - r.timestamp)
                    .to_std()
                    .map_or(true, |age| age <= self.window_age)
            })
            .filter(|r| {
                strsim::normalized_levenshtein(&candidate, &normalize(&r.content))
                    >= self.similarity
            })
            .count();
        repeats >= self.threshold
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
