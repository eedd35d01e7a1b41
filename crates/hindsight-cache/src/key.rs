// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic cache key derivation.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// SHA-256 hex digest identifying one cached computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Start a key for `operation`.
    pub fn builder(operation: impl Into<String>) -> CacheKeyBuilder {
        CacheKeyBuilder {
            operation: operation.into(),
            args: Vec::new(),
            named: BTreeMap::new(),
        }
    }

    /// Wrap an already-derived hex key, e.g. a file stem read from disk.
    ///
    /// Returns `None` unless `raw` is 64 lowercase hex characters.
    pub fn from_hex(raw: &str) -> Option<Self> {
        let valid = raw.len() == 64
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collects the operation name, positional arguments and named arguments.
///
/// Positional order matters; named arguments are sorted by name.
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    operation: String,
    args: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl CacheKeyBuilder {
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> CacheKey {
        let named: serde_json::Map<String, Value> = self.named.into_iter().collect();
        let canonical = Value::Array(vec![
            Value::String(self.operation),
            Value::Array(self.args),
            Value::Object(named),
        ]);
        let digest = Sha256::digest(canonical.to_string().as_bytes());
        CacheKey(hex::encode(digest))
    }
}
