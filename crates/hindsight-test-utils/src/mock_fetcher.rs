// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory research fetcher.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use hindsight_core::types::truncate_chars;
use hindsight_core::{
    AdapterType, FetchedDocument, Fetcher, HealthStatus, HindsightError, PluginAdapter,
};

/// Serves registered bodies by source string; anything else is a fetch error.
#[derive(Default)]
pub struct MockFetcher {
    sources: Mutex<HashMap<String, String>>,
    requested: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(self, source: &str, body: &str) -> Self {
        self.sources
            .lock()
            .unwrap()
            .insert(source.to_string(), body.to_string());
        self
    }

    /// Sources requested so far, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PluginAdapter for MockFetcher {
    fn name(&self) -> &str {
        "mock-fetcher"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Fetcher
    }

    async fn health_check(&self) -> Result<HealthStatus, HindsightError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(
        &self,
        source: &str,
        max_chars: usize,
    ) -> Result<FetchedDocument, HindsightError> {
        self.requested.lock().unwrap().push(source.to_string());
        let body = self
            .sources
            .lock()
            .unwrap()
            .get(source)
            .cloned()
            .ok_or_else(|| HindsightError::fetch(format!("no mock source `{source}`")))?;
        let (content, truncated) = truncate_chars(&body, max_chars);
        Ok(FetchedDocument {
            source: source.to_string(),
            content: content.to_string(),
            truncated,
        })
    }
}
