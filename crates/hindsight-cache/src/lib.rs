// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File-backed TTL cache for expensive operations.
//!
//! Each entry is one `<key>.json` file holding `{timestamp, result}`. The TTL
//! is supplied by the reader, so one entry can serve callers with different
//! freshness requirements.

pub mod embedder;
pub mod key;
pub mod store;

pub use embedder::CachingEmbedder;
pub use key::{CacheKey, CacheKeyBuilder};
pub use store::{CacheRecord, TtlCache};
