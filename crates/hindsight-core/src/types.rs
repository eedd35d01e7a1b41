// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Embedding,
    Fetcher,
    Storage,
    Cache,
}

/// Input to an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    /// Texts to embed, one vector is returned per text.
    pub texts: Vec<String>,
}

/// Output from an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    /// One vector per input text, in input order.
    pub embeddings: Vec<Vec<f32>>,
    /// Dimensionality of every vector in `embeddings`.
    pub dimensions: usize,
}

/// A document fetched for ephemeral research.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// The URL or path the content came from.
    pub source: String,
    /// Plain-text content, already capped to the requested size.
    pub content: String,
    /// Whether the content was cut at the size cap.
    pub truncated: bool,
}

/// Truncate a string to at most `max_chars` characters on a char boundary.
///
/// Returns the (possibly shortened) slice and whether anything was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> (&str, bool) {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => (&s[..idx], true),
        None => (s, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn adapter_type_round_trips_through_display() {
        for variant in [
            AdapterType::Embedding,
            AdapterType::Fetcher,
            AdapterType::Storage,
            AdapterType::Cache,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).unwrap();
            assert_eq!(parsed, variant);
        }
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let (s, cut) = truncate_chars("héllo wörld", 4);
        assert_eq!(s, "héll");
        assert!(cut);

        let (s, cut) = truncate_chars("short", 10);
        assert_eq!(s, "short");
        assert!(!cut);

        let (s, cut) = truncate_chars("exact", 5);
        assert_eq!(s, "exact");
        assert!(!cut);
    }
}
