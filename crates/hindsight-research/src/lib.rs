// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ephemeral research for the Hindsight memory engine.
//!
//! A source is fetched into a scratch artifact, reduced to the excerpts
//! relevant to a query, summarised into memory, and deleted. Raw content
//! never outlives the call.

pub mod artifact;
pub mod extract;
pub mod fetcher;
pub mod pipeline;

pub use artifact::{sweep_stale_artifacts, RawArtifact};
pub use extract::extract_relevant;
pub use fetcher::SourceFetcher;
pub use pipeline::{ResearchPipeline, ResearchReport};
