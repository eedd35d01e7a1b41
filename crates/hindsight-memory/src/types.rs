// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// What kind of observation a memory records.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum MemoryCategory {
    Decision,
    Preference,
    Learning,
    Pattern,
    Discovery,
    ProblemSolution,
    Context,
}

impl MemoryCategory {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Partition a memory belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Scope {
    /// Shared across every project.
    Global,
    /// Owned by one project, named after its directory.
    Project(String),
}

impl Scope {
    /// Reserved scope name for [`Scope::Global`].
    pub const GLOBAL: &'static str = "global";

    /// Derive the project scope from a working directory.
    ///
    /// The final path component names the project. A directory literally
    /// called `global` becomes `global-project` so it cannot alias the shared
    /// scope, and a path with no final component (e.g. `/`) is global.
    pub fn from_cwd(cwd: &Path) -> Self {
        match cwd.file_name().and_then(|n| n.to_str()) {
            Some(name) if name.eq_ignore_ascii_case(Self::GLOBAL) => {
                Scope::Project(format!("{name}-project"))
            }
            Some(name) if !name.trim().is_empty() => Scope::Project(name.to_string()),
            _ => Scope::Global,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Scope::Global => Self::GLOBAL,
            Scope::Project(name) => name,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Scope::Global)
    }
}

impl From<String> for Scope {
    fn from(value: String) -> Self {
        if value == Self::GLOBAL || value.trim().is_empty() {
            Scope::Global
        } else {
            Scope::Project(value)
        }
    }
}

impl From<&str> for Scope {
    fn from(value: &str) -> Self {
        Scope::from(value.to_string())
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.as_str().to_string()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

/// Open string-to-scalar mapping stored alongside each memory.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A single stored memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Content hash, see [`memory_id`].
    pub id: String,
    pub scope: Scope,
    pub category: MemoryCategory,
    /// Redacted text.
    pub content: String,
    /// Empty until an embedding has been computed.
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
    /// How many times this exact content was saved.
    pub usage_count: i64,
    /// How many searches returned this entry.
    pub retrieved_count: i64,
    /// Set when the embedding provider failed at save time.
    pub embedding_pending: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A compacted record of one work session. Never deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub scope: Scope,
    pub summary: String,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub created_at: String,
}

/// A directed, weighted, append-only edge between two memory ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: String,
    pub weight: f64,
    pub created_at: String,
}

/// An embedded memory considered for ranking.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub content: String,
    pub category: MemoryCategory,
    pub updated_at: String,
    pub embedding: Vec<f32>,
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub category: MemoryCategory,
    pub similarity: f64,
    pub updated_at: String,
    /// True when surfaced through a relationship edge rather than similarity.
    #[serde(default)]
    pub via_link: bool,
}

/// A ranked session summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHit {
    pub id: String,
    pub summary: String,
    pub similarity: f64,
    pub created_at: String,
}

/// Whether a save wrote a new row or merged into an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    Created,
    Merged,
}

impl SaveOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveOutcome::Created => "created",
            SaveOutcome::Merged => "merged",
        }
    }
}

/// Result of [`crate::MemoryService::save`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveResult {
    pub id: String,
    pub outcome: SaveOutcome,
    pub usage_count: i64,
    /// False when the entry was stored without an embedding.
    pub embedded: bool,
}

/// Counts reported by `hindsight doctor` and `MemoryStore::stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub memories: i64,
    pub pending_embeddings: i64,
    pub relationships: i64,
    pub sessions: i64,
}

/// Outcome of an embedding backfill pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    pub embedded: usize,
    pub failed: usize,
}

/// Deterministic memory id: the first 32 hex chars of
/// SHA-256(`scope` NUL `category` NUL `content`).
pub fn memory_id(scope: &Scope, category: MemoryCategory, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(scope.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(category.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(content.as_bytes());
    let mut id = hex::encode(hasher.finalize());
    id.truncate(32);
    id
}

/// Convert f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert SQLite BLOB back to f32 vector. Trailing partial bytes are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`.
///
/// Returns 0.0 when either norm is zero or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let x = f64::from(*x);
        let y = f64::from(*y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn categories_use_kebab_case() {
        assert_eq!(MemoryCategory::ProblemSolution.as_str(), "problem-solution");
        assert_eq!(
            MemoryCategory::from_str("problem-solution").unwrap(),
            MemoryCategory::ProblemSolution
        );
        for category in MemoryCategory::iter() {
            assert_eq!(MemoryCategory::from_str(category.as_str()).unwrap(), category);
        }
        assert!(MemoryCategory::from_str("gossip").is_err());
    }

    #[test]
    fn scope_from_cwd_uses_last_component() {
        assert_eq!(
            Scope::from_cwd(Path::new("/home/dev/projects/atlas")),
            Scope::Project("atlas".to_string())
        );
        assert_eq!(Scope::from_cwd(Path::new("/")), Scope::Global);
        assert_eq!(
            Scope::from_cwd(Path::new("/srv/global")),
            Scope::Project("global-project".to_string())
        );
    }

    #[test]
    fn scope_string_conversions() {
        assert_eq!(Scope::from("global"), Scope::Global);
        assert_eq!(Scope::from("atlas").to_string(), "atlas");
        let json = serde_json::to_string(&Scope::Project("atlas".into())).unwrap();
        assert_eq!(json, "\"atlas\"");
    }

    #[test]
    fn metadata_is_untagged() {
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), "https://docs.rs".into());
        metadata.insert("chars".into(), 42i64.into());
        metadata.insert("truncated".into(), true.into());
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"chars":42,"source":"https://docs.rs","truncated":true}"#);
        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn memory_id_is_deterministic_and_partitioned() {
        let project = Scope::Project("atlas".into());
        let a = memory_id(&project, MemoryCategory::Decision, "use sqlite");
        let b = memory_id(&project, MemoryCategory::Decision, "use sqlite");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert_ne!(a, memory_id(&Scope::Global, MemoryCategory::Decision, "use sqlite"));
        assert_ne!(a, memory_id(&project, MemoryCategory::Learning, "use sqlite"));
    }

    #[test]
    fn blob_roundtrip_preserves_values() {
        let original = vec![0.1_f32, -2.5, 3.25, 0.0];
        assert_eq!(blob_to_vec(&vec_to_blob(&original)), original);
        assert!(blob_to_vec(&[]).is_empty());
    }

    #[test]
    fn cosine_identical_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn cosine_opposite_and_mismatched() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
