// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fetcher trait for research sources.

use async_trait::async_trait;

use crate::error::HindsightError;
use crate::traits::adapter::PluginAdapter;
use crate::types::FetchedDocument;

/// Retrieves the text behind a URL or local path.
#[async_trait]
pub trait Fetcher: PluginAdapter {
    /// Fetches `source`, returning at most `max_chars` characters of text.
    async fn fetch(&self, source: &str, max_chars: usize)
        -> Result<FetchedDocument, HindsightError>;
}
