// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fetches research sources from HTTP(S) URLs or the local filesystem.
//!
//! HTTP goes through the SSRF-hardened client from `hindsight-security`.
//! HTML is rendered to plain text. Bodies are read at most a few bytes per
//! character past the cap, so an oversized source never lands in memory.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use hindsight_config::model::ResearchConfig;
use hindsight_core::types::truncate_chars;
use hindsight_core::{
    AdapterType, FetchedDocument, Fetcher, HealthStatus, HindsightError, PluginAdapter,
};
use hindsight_security::{build_fetch_client, parse_allowlist, validate_url_host};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Width used when rendering HTML to text.
const HTML_WRAP_WIDTH: usize = 120;

/// Worst-case UTF-8 bytes per character.
const MAX_BYTES_PER_CHAR: usize = 4;

/// Default [`Fetcher`] for the research pipeline.
pub struct SourceFetcher {
    client: reqwest::Client,
    allowed: Vec<IpAddr>,
    timeout: Duration,
}

impl SourceFetcher {
    pub fn new(config: &ResearchConfig) -> Result<Self, HindsightError> {
        let timeout = Duration::from_secs(config.fetch_timeout_secs);
        Ok(Self {
            client: build_fetch_client(&config.allowed_private_ips, timeout)?,
            allowed: parse_allowlist(&config.allowed_private_ips),
            timeout,
        })
    }

    async fn fetch_url(
        &self,
        url: &str,
        max_chars: usize,
    ) -> Result<FetchedDocument, HindsightError> {
        validate_url_host(url, &self.allowed)?;

        let mut response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                HindsightError::Timeout {
                    duration: self.timeout,
                }
            } else {
                HindsightError::Fetch {
                    message: format!("request to {url} failed: {e}"),
                    source: Some(Box::new(e)),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HindsightError::fetch(format!("{url} returned HTTP {status}")));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("html"));

        let byte_cap = max_chars.saturating_mul(MAX_BYTES_PER_CHAR);
        let mut body: Vec<u8> = Vec::new();
        let mut cut = false;
        while let Some(chunk) = response.chunk().await.map_err(|e| HindsightError::Fetch {
            message: format!("reading body of {url} failed: {e}"),
            source: Some(Box::new(e)),
        })? {
            body.extend_from_slice(&chunk);
            if body.len() >= byte_cap {
                cut = body.len() > byte_cap;
                body.truncate(byte_cap);
                break;
            }
        }

        let text = String::from_utf8_lossy(&body);
        let text = if is_html || looks_like_html(&text) {
            html_to_text(&text)?
        } else {
            text.into_owned()
        };
        debug!(url = %url, status = %status, bytes = body.len(), "fetched url");
        Ok(capped(url, &text, max_chars, cut))
    }

    async fn fetch_file(
        &self,
        path: &Path,
        max_chars: usize,
    ) -> Result<FetchedDocument, HindsightError> {
        let read_err = |e: std::io::Error| HindsightError::Fetch {
            message: format!("cannot read {}: {e}", path.display()),
            source: Some(Box::new(e)),
        };
        let file = tokio::fs::File::open(path).await.map_err(read_err)?;
        let byte_cap = max_chars.saturating_mul(MAX_BYTES_PER_CHAR);
        let (bytes, cut) = read_capped(file, byte_cap).await.map_err(read_err)?;
        let text = String::from_utf8_lossy(&bytes);
        let is_html = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));
        let text = if is_html {
            html_to_text(&text)?
        } else {
            text.into_owned()
        };
        debug!(path = %path.display(), bytes = bytes.len(), cut, "read local file");
        Ok(capped(&path.display().to_string(), &text, max_chars, cut))
    }
}

/// Read at most `byte_cap` bytes. The flag is set when more input remained.
async fn read_capped<R: AsyncRead + Unpin>(
    reader: R,
    byte_cap: usize,
) -> std::io::Result<(Vec<u8>, bool)> {
    let limit = u64::try_from(byte_cap).unwrap_or(u64::MAX).saturating_add(1);
    let mut bytes = Vec::new();
    reader.take(limit).read_to_end(&mut bytes).await?;
    let cut = bytes.len() > byte_cap;
    bytes.truncate(byte_cap);
    Ok((bytes, cut))
}

fn is_http(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn looks_like_html(text: &str) -> bool {
    let head = text.trim_start();
    let head = truncate_chars(head, 64).0.to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

fn html_to_text(html: &str) -> Result<String, HindsightError> {
    html2text::from_read(html.as_bytes(), HTML_WRAP_WIDTH)
        .map_err(|e| HindsightError::Serialization(format!("cannot render HTML: {e}")))
}

fn capped(source: &str, text: &str, max_chars: usize, already_cut: bool) -> FetchedDocument {
    let (content, cut) = truncate_chars(text, max_chars);
    FetchedDocument {
        source: source.to_string(),
        content: content.to_string(),
        truncated: cut || already_cut,
    }
}

#[async_trait]
impl PluginAdapter for SourceFetcher {
    fn name(&self) -> &str {
        "source-fetcher"
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
impl Fetcher for SourceFetcher {
    async fn fetch(
        &self,
        source: &str,
        max_chars: usize,
    ) -> Result<FetchedDocument, HindsightError> {
        let source = source.trim();
        if is_http(source) {
            self.fetch_url(source, max_chars).await
        } else if source.contains("://") {
            match source.strip_prefix("file://") {
                Some(path) => self.fetch_file(Path::new(path), max_chars).await,
                None => Err(HindsightError::Security(format!(
                    "unsupported research source `{source}`"
                ))),
            }
        } else {
            self.fetch_file(Path::new(source), max_chars).await
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn fetcher(allow_loopback: bool) -> SourceFetcher {
        let mut config = ResearchConfig::default();
        if allow_loopback {
            config.allowed_private_ips = vec!["127.0.0.1".to_string()];
        }
        SourceFetcher::new(&config).unwrap()
    }

    #[tokio::test]
    async fn html_response_is_rendered_to_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/doc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string(
                        "<html><body><h1>WAL mode</h1><p>Readers never block.</p></body></html>",
                    ),
            )
            .mount(&server)
            .await;

        let doc = fetcher(true)
            .fetch(&format!("{}/doc", server.uri()), 10_000)
            .await
            .unwrap();
        assert!(doc.content.contains("WAL mode"));
        assert!(doc.content.contains("Readers never block."));
        assert!(!doc.content.contains("<p>"));
        assert!(!doc.truncated);
    }

    #[tokio::test]
    async fn body_is_capped_at_max_chars() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(5_000)))
            .mount(&server)
            .await;

        let doc = fetcher(true).fetch(&server.uri(), 100).await.unwrap();
        assert_eq!(doc.content.chars().count(), 100);
        assert!(doc.truncated);
    }

    #[tokio::test]
    async fn non_success_status_is_a_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher(true).fetch(&server.uri(), 100).await.unwrap_err();
        assert!(matches!(err, HindsightError::Fetch { .. }));
        assert!(err.is_degradable());
    }

    #[tokio::test]
    async fn loopback_is_blocked_without_allowlist() {
        let err = fetcher(false)
            .fetch("http://127.0.0.1:9/doc", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, HindsightError::Security(_)));
    }

    #[tokio::test]
    async fn unsupported_scheme_is_refused() {
        let err = fetcher(false).fetch("ftp://example.com/x", 100).await.unwrap_err();
        assert!(matches!(err, HindsightError::Security(_)));
    }

    #[tokio::test]
    async fn local_files_are_read_and_html_files_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "plain notes").unwrap();
        let html = dir.path().join("page.html");
        std::fs::write(&html, "<p>rendered <b>page</b></p>").unwrap();

        let f = fetcher(false);
        let doc = f.fetch(txt.to_str().unwrap(), 100).await.unwrap();
        assert_eq!(doc.content, "plain notes");

        let uri = format!("file://{}", html.display());
        let doc = f.fetch(&uri, 100).await.unwrap();
        assert!(doc.content.contains("rendered"));
        assert!(!doc.content.contains("<b>"));
    }

    #[tokio::test]
    async fn endless_reader_stops_at_byte_cap() {
        let (bytes, cut) = read_capped(tokio::io::repeat(b'z'), 400).await.unwrap();
        assert_eq!(bytes.len(), 400);
        assert!(cut);

        let (bytes, cut) = read_capped(&b"short"[..], 400).await.unwrap();
        assert_eq!(bytes, b"short");
        assert!(!cut);
    }

    #[tokio::test]
    async fn large_local_file_is_capped_and_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let big = dir.path().join("big.txt");
        std::fs::write(&big, "y".repeat(1_000_000)).unwrap();

        let doc = fetcher(false).fetch(big.to_str().unwrap(), 100).await.unwrap();
        assert_eq!(doc.content.chars().count(), 100);
        assert!(doc.truncated);
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_error() {
        let err = fetcher(false)
            .fetch("/definitely/not/here.txt", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, HindsightError::Fetch { .. }));
    }
}
