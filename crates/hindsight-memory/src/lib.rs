// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory for the Hindsight engine.
//!
//! ## Architecture
//!
//! - **MemoryStore**: SQLite persistence with BLOB vectors
//! - **RelationshipGraph**: append-only weighted edges between memories
//! - **search**: brute-force cosine ranking with an inclusive floor
//! - **HttpEmbedder**: Ollama-compatible embedding provider
//! - **MemoryService**: redaction, dedup, fail-open save/search, backfill

pub mod embedder;
pub mod graph;
pub mod search;
pub mod service;
pub mod store;
pub mod types;

pub use embedder::HttpEmbedder;
pub use graph::RelationshipGraph;
pub use service::MemoryService;
pub use store::MemoryStore;
pub use types::*;
