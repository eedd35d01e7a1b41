// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedder wrapper that memoises vectors in the TTL cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hindsight_core::{
    AdapterType, Embedder, EmbeddingInput, EmbeddingOutput, HealthStatus, HindsightError,
    PluginAdapter,
};
use tracing::{debug, warn};

use crate::key::CacheKey;
use crate::store::TtlCache;

/// Serves embeddings from the cache, calling the inner provider only for
/// texts that miss. Keys are `("embed", model, text)`.
pub struct CachingEmbedder {
    inner: Arc<dyn Embedder>,
    cache: TtlCache,
    model: String,
    ttl: Duration,
}

impl CachingEmbedder {
    pub fn new(
        inner: Arc<dyn Embedder>,
        cache: TtlCache,
        model: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            inner,
            cache,
            model: model.into(),
            ttl,
        }
    }

    fn key(&self, text: &str) -> CacheKey {
        CacheKey::builder("embed")
            .arg(self.model.as_str())
            .arg(text)
            .build()
    }
}

#[async_trait]
impl PluginAdapter for CachingEmbedder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn version(&self) -> semver::Version {
        self.inner.version()
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, HindsightError> {
        self.inner.health_check().await
    }
}

#[async_trait]
impl Embedder for CachingEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, HindsightError> {
        let mut slots: Vec<Option<Vec<f32>>> = Vec::with_capacity(input.texts.len());
        let mut missing = Vec::new();
        for (i, text) in input.texts.iter().enumerate() {
            let cached: Option<Vec<f32>> = self.cache.get(&self.key(text), self.ttl).await;
            if cached.is_none() {
                missing.push(i);
            }
            slots.push(cached);
        }

        if !missing.is_empty() {
            let texts: Vec<String> = missing.iter().map(|&i| input.texts[i].clone()).collect();
            let output = self.inner.embed(EmbeddingInput { texts }).await?;
            if output.embeddings.len() != missing.len() {
                return Err(HindsightError::provider(format!(
                    "provider returned {} embeddings for {} inputs",
                    output.embeddings.len(),
                    missing.len()
                )));
            }
            for (&i, vector) in missing.iter().zip(output.embeddings) {
                if let Err(e) = self.cache.set(&self.key(&input.texts[i]), &vector).await {
                    warn!(error = %e, "failed to cache embedding");
                }
                slots[i] = Some(vector);
            }
        }

        debug!(
            total = input.texts.len(),
            cached = input.texts.len() - missing.len(),
            "embed via cache"
        );
        let embeddings: Vec<Vec<f32>> = slots.into_iter().flatten().collect();
        let dimensions = embeddings.first().map_or(0, Vec::len);
        Ok(EmbeddingOutput {
            embeddings,
            dimensions,
        })
    }
}
