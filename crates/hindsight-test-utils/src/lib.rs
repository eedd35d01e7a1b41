// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Hindsight integration tests.
//!
//! Provides deterministic stand-ins for the embedding provider, the research
//! fetcher and the wall clock, plus a harness wiring them to a temp-dir
//! database and configuration.

pub mod clock;
pub mod harness;
pub mod mock_embedder;
pub mod mock_fetcher;

pub use clock::ManualClock;
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_embedder::MockEmbedder;
pub use mock_fetcher::MockFetcher;
