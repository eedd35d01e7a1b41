// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSRF-safe DNS resolver that blocks connections to private IP ranges.
//!
//! Implements `reqwest::dns::Resolve` to filter resolved IP addresses before
//! any connection is made. Literal IPs in URLs never reach the resolver, so
//! [`validate_url_host`] checks those up front.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use hindsight_core::HindsightError;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tracing::{debug, warn};

/// Parse an allowlist of IP strings, silently dropping invalid entries.
pub fn parse_allowlist(allowed: &[String]) -> Vec<IpAddr> {
    allowed
        .iter()
        .filter_map(|s| s.parse::<IpAddr>().ok())
        .collect()
}

/// DNS resolver that drops private and reserved addresses.
///
/// A private address survives only if it is in the configured allowlist.
pub struct SsrfSafeResolver {
    allowed_private_ips: Vec<IpAddr>,
}

impl SsrfSafeResolver {
    /// Create a new resolver with the given private IP allowlist.
    pub fn new(allowed: &[String]) -> Self {
        Self {
            allowed_private_ips: parse_allowlist(allowed),
        }
    }

    /// Check if an IP is in a private or reserved range.
    ///
    /// Blocks: RFC 1918, loopback, link-local, broadcast, unspecified,
    /// cloud metadata endpoint, IPv6 loopback, unique-local, link-local.
    pub fn is_private(ip: &IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => {
                v4.is_private()
                    || v4.is_loopback()
                    || v4.is_link_local()
                    || v4.is_broadcast()
                    || v4.is_unspecified()
                    || *v4 == Ipv4Addr::new(169, 254, 169, 254)
            }
            IpAddr::V6(v6) => {
                v6.is_loopback()
                    || v6.is_unspecified()
                    || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7 unique local
                    || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10 link-local
                    || v6.to_ipv4_mapped().is_some_and(|v4| Self::is_private(&IpAddr::V4(v4)))
            }
        }
    }
}

impl Resolve for SsrfSafeResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let allowed = self.allowed_private_ips.clone();
        let hostname = name.as_str().to_string();

        Box::pin(async move {
            let host = format!("{hostname}:0");
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&host)
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?
                .collect();

            let filtered: Vec<SocketAddr> = addrs
                .into_iter()
                .filter(|addr| {
                    let ip = addr.ip();
                    if !SsrfSafeResolver::is_private(&ip) {
                        return true;
                    }
                    if allowed.contains(&ip) {
                        debug!(ip = %ip, host = %hostname, "allowing configured private IP");
                        true
                    } else {
                        warn!(ip = %ip, host = %hostname, "SSRF blocked: resolved to private IP");
                        false
                    }
                })
                .collect();

            if filtered.is_empty() {
                let err: Box<dyn std::error::Error + Send + Sync> =
                    format!("SSRF blocked: {hostname} resolves only to private IPs").into();
                return Err(err);
            }

            let addrs: Addrs = Box::new(filtered.into_iter());
            Ok(addrs)
        })
    }
}

/// Validate a research URL before fetching.
///
/// Rejects non-HTTP schemes and literal private IPs that are not allowlisted.
/// Hostnames pass here and are checked by [`SsrfSafeResolver`] at connect time.
pub fn validate_url_host(url: &str, allowed: &[IpAddr]) -> Result<(), HindsightError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| HindsightError::Security(format!("invalid URL `{url}`: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(HindsightError::Security(format!(
            "scheme `{}` is not allowed for research fetches",
            parsed.scheme()
        )));
    }

    let ip = match parsed.host() {
        Some(url::Host::Ipv4(v4)) => IpAddr::V4(v4),
        Some(url::Host::Ipv6(v6)) => IpAddr::V6(v6),
        Some(url::Host::Domain(_)) => return Ok(()),
        None => {
            return Err(HindsightError::Security(format!("URL `{url}` has no host")));
        }
    };

    if SsrfSafeResolver::is_private(&ip) && !allowed.contains(&ip) {
        warn!(ip = %ip, url = %url, "SSRF blocked: URL targets private IP");
        return Err(HindsightError::Security(format!(
            "SSRF blocked: URL targets private IP {ip}"
        )));
    }
    Ok(())
}
