// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedder for tests.
//!
//! Each word of three or more characters adds weight to one of a fixed set of
//! buckets chosen by an FNV-1a hash, so texts sharing words point in similar
//! directions. Exact vectors can be pinned per text.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use hindsight_core::{
    AdapterType, Embedder, EmbeddingInput, EmbeddingOutput, HealthStatus, HindsightError,
    PluginAdapter,
};

/// Default vector length.
pub const MOCK_DIMENSIONS: usize = 16;

pub struct MockEmbedder {
    dimensions: usize,
    pinned: Mutex<HashMap<String, Vec<f32>>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::with_dimensions(MOCK_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            pinned: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Return exactly `vector` whenever `text` is embedded.
    pub fn pin(&self, text: &str, vector: Vec<f32>) {
        self.pinned.lock().unwrap().insert(text.to_string(), vector);
    }

    /// Make every subsequent call fail with a provider error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `embed` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The vector this embedder produces for `text`.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(v) = self.pinned.lock().unwrap().get(text) {
            return v.clone();
        }
        let mut v = vec![0.0_f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() >= 3)
        {
            let bucket = fnv1a(&word.to_lowercase()) as usize % self.dimensions;
            v[bucket] += 1.0;
        }
        v
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, HindsightError> {
        if self.failing.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("mock failure".to_string()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, HindsightError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(HindsightError::provider("mock embedder forced failure"));
        }
        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| self.vector_for(t)).collect(),
            dimensions: self.dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_same_vector() {
        let e = MockEmbedder::new();
        let a = e.embed_text("retry uploads").await.unwrap();
        let b = e.embed_text("Retry  uploads!").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), MOCK_DIMENSIONS);
        assert_eq!(e.calls(), 2);
    }

    #[tokio::test]
    async fn pinned_vectors_and_failure_switch() {
        let e = MockEmbedder::new();
        e.pin("q", vec![1.0, 0.0]);
        assert_eq!(e.embed_text("q").await.unwrap(), vec![1.0, 0.0]);

        e.set_failing(true);
        let err = e.embed_text("q").await.unwrap_err();
        assert!(err.is_degradable());
    }
}
