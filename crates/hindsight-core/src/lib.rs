// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Hindsight memory engine.
//!
//! This crate provides the foundational trait definitions, error type, and
//! common types used throughout the workspace. The embedding provider and
//! research fetcher are modelled as injectable traits.

pub mod error;
pub mod recording;
pub mod traits;
pub mod types;

pub use error::HindsightError;
pub use traits::{Clock, Embedder, Fetcher, PluginAdapter, SystemClock};
pub use types::{AdapterType, EmbeddingInput, EmbeddingOutput, FetchedDocument, HealthStatus};

/// Timestamp format used for every persisted record.
///
/// Fixed-width UTC with millisecond precision so lexical order equals
/// chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Format a timestamp with [`TIMESTAMP_FORMAT`].
pub fn format_timestamp(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct FixedEmbedder {
        vector: Vec<f32>,
    }

    #[async_trait]
    impl PluginAdapter for FixedEmbedder {
        fn name(&self) -> &str {
            "fixed"
        }

        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::Embedding
        }

        async fn health_check(&self) -> Result<HealthStatus, HindsightError> {
            Ok(HealthStatus::Healthy)
        }
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, HindsightError> {
            Ok(EmbeddingOutput {
                embeddings: input.texts.iter().map(|_| self.vector.clone()).collect(),
                dimensions: self.vector.len(),
            })
        }
    }

    #[tokio::test]
    async fn embed_text_returns_first_vector() {
        let embedder = FixedEmbedder {
            vector: vec![0.5, 0.5],
        };
        let v = embedder.embed_text("hello").await.unwrap();
        assert_eq!(v, vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn embed_text_rejects_empty_vector() {
        let embedder = FixedEmbedder { vector: vec![] };
        let err = embedder.embed_text("hello").await.unwrap_err();
        assert!(matches!(err, HindsightError::Provider { .. }));
    }

    #[test]
    fn timestamps_sort_lexically() {
        let a = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let (fa, fb) = (format_timestamp(a), format_timestamp(b));
        assert_eq!(fa, "2026-03-01T09:00:00.000Z");
        assert!(fa < fb);
    }
}
