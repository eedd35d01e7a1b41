// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Injectable capability traits.
//!
//! External collaborators (embedding provider, research fetcher, wall clock)
//! sit behind these traits so tests can substitute deterministic fakes.

pub mod adapter;
pub mod clock;
pub mod embedding;
pub mod fetcher;

pub use adapter::PluginAdapter;
pub use clock::{Clock, SystemClock};
pub use embedding::Embedder;
pub use fetcher::Fetcher;
