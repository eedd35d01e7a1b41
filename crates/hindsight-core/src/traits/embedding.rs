// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::HindsightError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EmbeddingInput, EmbeddingOutput};

/// Turns text into fixed-length vectors.
///
/// Implementations must resolve every transport failure (timeout, non-2xx,
/// malformed body) to an `Err`, never a panic.
#[async_trait]
pub trait Embedder: PluginAdapter {
    /// Generates embeddings for the given input.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, HindsightError>;

    /// Embeds a single text and returns its vector.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, HindsightError> {
        let output = self
            .embed(EmbeddingInput {
                texts: vec![text.to_string()],
            })
            .await?;
        output
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| HindsightError::provider("embedding returned no vector"))
    }
}
