// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Hindsight memory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. On-disk locations are plain fields so every
//! operation receives its paths explicitly instead of reading globals.

use serde::{Deserialize, Serialize};

/// Top-level Hindsight configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HindsightConfig {
    /// Log output settings.
    #[serde(default)]
    pub log: LogConfig,

    /// SQLite store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Embedding provider settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Similarity search settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// TTL cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Ephemeral research pipeline settings.
    #[serde(default)]
    pub research: ResearchConfig,

    /// Trigger classifier and injection settings.
    #[serde(default)]
    pub trigger: TriggerConfig,
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Default level for the `hindsight` targets when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a writer waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn data_path(file: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("hindsight").join(file))
        .unwrap_or_else(|| std::path::PathBuf::from(file))
        .to_string_lossy()
        .into_owned()
}

fn cache_path(file: &str) -> String {
    dirs::cache_dir()
        .map(|p| p.join("hindsight").join(file))
        .unwrap_or_else(|| std::path::PathBuf::from(".hindsight-cache").join(file))
        .to_string_lossy()
        .into_owned()
}

fn default_database_path() -> String {
    data_path("hindsight.db")
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Embedding provider configuration.
///
/// The provider is any Ollama-compatible HTTP endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// When false, every save stores an empty embedding and search returns nothing.
    #[serde(default = "default_embedding_enabled")]
    pub enabled: bool,

    /// Base URL of the embedding service.
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Request timeout in seconds.
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,

    /// Input longer than this many characters is truncated before sending.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// Expected vector length. When unset it is learned from the store.
    #[serde(default)]
    pub dimensions: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: default_embedding_enabled(),
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            timeout_secs: default_embedding_timeout_secs(),
            max_input_chars: default_max_input_chars(),
            dimensions: None,
        }
    }
}

fn default_embedding_enabled() -> bool {
    true
}

fn default_embedding_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    10
}

fn default_max_input_chars() -> usize {
    8000
}

/// Similarity search configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Minimum cosine similarity for a search hit (inclusive).
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Default number of results returned by a search.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Surface linked neighbours of the top hit even below the floor.
    #[serde(default = "default_link_boost")]
    pub link_boost: bool,

    /// Minimum edge weight for a neighbour to be surfaced.
    #[serde(default = "default_link_min_weight")]
    pub link_min_weight: f64,

    /// Maximum entries re-embedded per backfill run.
    #[serde(default = "default_backfill_batch")]
    pub backfill_batch: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            top_k: default_top_k(),
            link_boost: default_link_boost(),
            link_min_weight: default_link_min_weight(),
            backfill_batch: default_backfill_batch(),
        }
    }
}

fn default_similarity_threshold() -> f64 {
    0.3
}

fn default_top_k() -> usize {
    5
}

fn default_link_boost() -> bool {
    true
}

fn default_link_min_weight() -> f64 {
    1.0
}

fn default_backfill_batch() -> usize {
    50
}

/// TTL cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Directory holding one JSON file per cache key.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Freshness window for cached embeddings.
    #[serde(default = "default_embedding_ttl_secs")]
    pub embedding_ttl_secs: u64,

    /// Entries older than this are removed by `sweep`.
    #[serde(default = "default_sweep_max_age_secs")]
    pub sweep_max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            embedding_ttl_secs: default_embedding_ttl_secs(),
            sweep_max_age_secs: default_sweep_max_age_secs(),
        }
    }
}

fn default_cache_dir() -> String {
    cache_path("entries")
}

fn default_embedding_ttl_secs() -> u64 {
    86_400
}

fn default_sweep_max_age_secs() -> u64 {
    7 * 86_400
}

/// Ephemeral research pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ResearchConfig {
    /// Scratch directory for raw fetched artifacts.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: String,

    /// Maximum characters kept from a fetched source.
    #[serde(default = "default_max_fetch_chars")]
    pub max_fetch_chars: usize,

    /// Lines of surrounding context kept around each match.
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,

    /// Hard cap on extracted output.
    #[serde(default = "default_max_extract_chars")]
    pub max_extract_chars: usize,

    /// Length of the summary handed to the memory write path.
    #[serde(default = "default_summary_chars")]
    pub summary_chars: usize,

    /// Network fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Leftover raw artifacts older than this are removed opportunistically.
    #[serde(default = "default_stale_artifact_secs")]
    pub stale_artifact_secs: u64,

    /// Private IPs that research fetches may reach (e.g. a local docs server).
    #[serde(default)]
    pub allowed_private_ips: Vec<String>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            max_fetch_chars: default_max_fetch_chars(),
            context_lines: default_context_lines(),
            max_extract_chars: default_max_extract_chars(),
            summary_chars: default_summary_chars(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            stale_artifact_secs: default_stale_artifact_secs(),
            allowed_private_ips: Vec::new(),
        }
    }
}

fn default_scratch_dir() -> String {
    cache_path("research")
}

fn default_max_fetch_chars() -> usize {
    100_000
}

fn default_context_lines() -> usize {
    3
}

fn default_max_extract_chars() -> usize {
    5_000
}

fn default_summary_chars() -> usize {
    500
}

fn default_fetch_timeout_secs() -> u64 {
    20
}

fn default_stale_artifact_secs() -> u64 {
    3600
}

/// Trigger classifier, cooldown, and circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerConfig {
    /// Directory holding one state file per session.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// Append-only log of emitted hints.
    #[serde(default = "default_hint_log_path")]
    pub hint_log_path: String,

    /// Prompts shorter than this are ignored without classification.
    #[serde(default = "default_min_prompt_chars")]
    pub min_prompt_chars: usize,

    /// Maximum memories formatted into one context block.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Per-memory character cap inside the context block.
    #[serde(default = "default_max_hint_chars")]
    pub max_hint_chars: usize,

    /// Identical hints already emitted this many times are suppressed.
    #[serde(default = "default_breaker_threshold")]
    pub breaker_threshold: usize,

    /// Number of most recent hint log entries the breaker inspects.
    #[serde(default = "default_breaker_window")]
    pub breaker_window: usize,

    /// Hints older than this do not count towards the breaker.
    #[serde(default = "default_breaker_window_secs")]
    pub breaker_window_secs: u64,

    /// Normalised Levenshtein similarity at which two hints count as duplicates.
    #[serde(default = "default_breaker_similarity")]
    pub breaker_similarity: f64,

    /// Custom rule set. Empty means the built-in rules.
    #[serde(default)]
    pub rules: Vec<TriggerRuleConfig>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            hint_log_path: default_hint_log_path(),
            min_prompt_chars: default_min_prompt_chars(),
            max_results: default_max_results(),
            max_hint_chars: default_max_hint_chars(),
            breaker_threshold: default_breaker_threshold(),
            breaker_window: default_breaker_window(),
            breaker_window_secs: default_breaker_window_secs(),
            breaker_similarity: default_breaker_similarity(),
            rules: Vec::new(),
        }
    }
}

fn default_state_dir() -> String {
    data_path("sessions")
}

fn default_hint_log_path() -> String {
    data_path("hints.jsonl")
}

fn default_min_prompt_chars() -> usize {
    15
}

fn default_max_results() -> usize {
    5
}

fn default_max_hint_chars() -> usize {
    200
}

fn default_breaker_threshold() -> usize {
    3
}

fn default_breaker_window() -> usize {
    20
}

fn default_breaker_window_secs() -> u64 {
    600
}

fn default_breaker_similarity() -> f64 {
    0.9
}

/// One trigger rule as written in `[[trigger.rules]]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerRuleConfig {
    /// Trigger category, e.g. `decision` or `past-work`.
    pub category: String,

    /// Case-insensitive substrings that fire the rule.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Regular expressions (matched case-insensitively) that fire the rule.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// One of `critical`, `high`, `medium`, `low`.
    #[serde(default = "default_rule_priority")]
    pub priority: String,

    /// Cooldown in conversation turns.
    #[serde(default)]
    pub cooldown_turns: Option<u32>,

    /// Cooldown in seconds. Cannot be combined with `cooldown_turns`.
    #[serde(default)]
    pub cooldown_secs: Option<u64>,

    /// Per-rule minimum prompt length.
    #[serde(default)]
    pub min_chars: Option<usize>,
}

fn default_rule_priority() -> String {
    "medium".to_string()
}
