// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hardened HTTP client for research fetches.

use std::sync::Arc;
use std::time::Duration;

use hindsight_core::HindsightError;
use tracing::error;

use crate::ssrf::SsrfSafeResolver;

/// Build a reqwest::Client for untrusted URLs.
///
/// - Minimum TLS 1.2.
/// - SSRF-safe DNS resolver honouring the private IP allowlist.
/// - Whole-request timeout so a slow source can never block the caller.
/// - At most five redirects.
pub fn build_fetch_client(
    allowed_private_ips: &[String],
    timeout: Duration,
) -> Result<reqwest::Client, HindsightError> {
    let resolver = SsrfSafeResolver::new(allowed_private_ips);

    reqwest::Client::builder()
        .min_tls_version(reqwest::tls::Version::TLS_1_2)
        .dns_resolver(Arc::new(resolver))
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(timeout)
        .user_agent(concat!("hindsight/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            error!("failed to build fetch client: {e}");
            HindsightError::Security(format!("failed to build fetch client: {e}"))
        })
}
