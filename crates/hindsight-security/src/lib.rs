// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Privacy and network safety for the Hindsight memory engine.
//!
//! Content is scrubbed of `<private>` segments and known secret formats
//! before it reaches storage, and research fetches go through an HTTP client
//! whose DNS resolver refuses private address ranges.

pub mod client;
pub mod redact;
pub mod ssrf;

pub use client::build_fetch_client;
pub use redact::{contains_private_marker, redact, redact_secrets, strip_private, REDACTED};
pub use ssrf::{parse_allowlist, validate_url_host, SsrfSafeResolver};
