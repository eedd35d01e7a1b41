// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP embedding provider speaking the Ollama `/api/embed` protocol.
//!
//! Request: `POST {base_url}/api/embed {"model": ..., "input": [...]}`.
//! Response: `{"embeddings": [[f32, ...], ...]}`. Every transport failure
//! (timeout, non-2xx, malformed body) surfaces as a degradable error.

use std::time::Duration;

use async_trait::async_trait;
use hindsight_config::model::EmbeddingConfig;
use hindsight_core::types::truncate_chars;
use hindsight_core::{
    AdapterType, Embedder, EmbeddingInput, EmbeddingOutput, HealthStatus, HindsightError,
    PluginAdapter,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding client for a local or remote Ollama-compatible server.
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
    max_input_chars: usize,
    expected_dimensions: Option<usize>,
}

impl HttpEmbedder {
    /// Build a client from configuration.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, HindsightError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| HindsightError::Provider {
                message: format!("failed to build embedding client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout,
            max_input_chars: config.max_input_chars,
            expected_dimensions: config.dimensions,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_send_err(&self, e: reqwest::Error) -> HindsightError {
        if e.is_timeout() {
            HindsightError::Timeout {
                duration: self.timeout,
            }
        } else {
            HindsightError::Provider {
                message: format!("embedding request failed: {e}"),
                source: Some(Box::new(e)),
            }
        }
    }
}

#[async_trait]
impl PluginAdapter for HttpEmbedder {
    fn name(&self) -> &str {
        "http-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, HindsightError> {
        match self.embed_text("health check").await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, HindsightError> {
        if input.texts.is_empty() {
            return Ok(EmbeddingOutput {
                embeddings: vec![],
                dimensions: 0,
            });
        }

        let request = EmbedRequest {
            model: &self.model,
            input: input
                .texts
                .iter()
                .map(|t| truncate_chars(t, self.max_input_chars).0)
                .collect(),
        };

        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_err(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HindsightError::provider(format!(
                "embedding provider returned {status}: {}",
                truncate_chars(&body, 200).0
            )));
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_send_err(e)
            } else {
                HindsightError::Provider {
                    message: format!("malformed embedding response: {e}"),
                    source: Some(Box::new(e)),
                }
            }
        })?;

        if parsed.embeddings.len() != input.texts.len() {
            return Err(HindsightError::provider(format!(
                "expected {} embeddings, got {}",
                input.texts.len(),
                parsed.embeddings.len()
            )));
        }

        let dimensions = parsed.embeddings.first().map_or(0, Vec::len);
        if dimensions == 0 || parsed.embeddings.iter().any(|v| v.len() != dimensions) {
            return Err(HindsightError::provider(
                "embedding response has empty or ragged vectors",
            ));
        }
        if let Some(expected) = self.expected_dimensions {
            if expected != dimensions {
                return Err(HindsightError::provider(format!(
                    "model {} returned {dimensions} dimensions, expected {expected}",
                    self.model
                )));
            }
        }

        debug!(model = %self.model, count = parsed.embeddings.len(), dimensions, "embedded texts");
        Ok(EmbeddingOutput {
            embeddings: parsed.embeddings,
            dimensions,
        })
    }
}
