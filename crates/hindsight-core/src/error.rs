// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Hindsight memory engine.

use thiserror::Error;

/// The primary error type used across all Hindsight crates.
///
/// Variants fall into two groups. Transport and data failures (storage,
/// provider, fetch, timeout, I/O, serialization) are *degradable*: public
/// engine operations turn them into empty results so the interactive caller
/// is never blocked. Configuration, security and internal errors are engine
/// faults and always propagate.
#[derive(Debug, Error)]
pub enum HindsightError {
    /// Configuration errors (invalid values, bad rule definitions).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, corrupt rows).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Embedding provider errors (unreachable, non-2xx, malformed body).
    #[error("embedding provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Research source fetch errors (network failure, unreadable file).
    #[error("fetch error: {message}")]
    Fetch {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Filesystem errors (cache directory, scratch artifacts, session state).
    #[error("i/o error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Malformed stored record or unparsable input.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A request was refused by a security policy (SSRF, disallowed scheme).
    #[error("security policy violation: {0}")]
    Security(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HindsightError {
    /// Returns true for transport and data errors that callers should
    /// degrade to an empty result instead of surfacing.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            HindsightError::Storage { .. }
                | HindsightError::Provider { .. }
                | HindsightError::Fetch { .. }
                | HindsightError::Timeout { .. }
                | HindsightError::Io { .. }
                | HindsightError::Serialization(_)
        )
    }

    /// Shorthand for a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        HindsightError::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a fetch error without an underlying source.
    pub fn fetch(message: impl Into<String>) -> Self {
        HindsightError::Fetch {
            message: message.into(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for HindsightError {
    fn from(e: serde_json::Error) -> Self {
        HindsightError::Serialization(e.to_string())
    }
}
