// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade. Nothing is exported unless the host installs a
//! recorder; without one every call is a no-op.

use metrics::{describe_counter, describe_histogram};

/// Register all Hindsight metric descriptions.
pub fn register_metrics() {
    describe_counter!("hindsight_memory_saves_total", "Memory saves by outcome");
    describe_counter!("hindsight_searches_total", "Similarity searches run");
    describe_histogram!("hindsight_search_hits", "Hits returned per search");
    describe_counter!(
        "hindsight_degraded_total",
        "Operations that failed open to an empty result"
    );
    describe_counter!("hindsight_cache_lookups_total", "TTL cache lookups by result");
    describe_counter!("hindsight_research_runs_total", "Research pipeline runs by outcome");
    describe_counter!("hindsight_hints_total", "Hook decisions by category and outcome");
}

/// Record a memory save. `outcome` is `created` or `merged`.
pub fn record_save(outcome: &'static str) {
    metrics::counter!("hindsight_memory_saves_total", "outcome" => outcome).increment(1);
}

/// Record a completed search and how many hits it returned.
pub fn record_search(hits: usize) {
    metrics::counter!("hindsight_searches_total").increment(1);
    metrics::histogram!("hindsight_search_hits").record(hits as f64);
}

/// Record an operation that swallowed a transport or data error.
pub fn record_degraded(operation: &'static str) {
    metrics::counter!("hindsight_degraded_total", "operation" => operation).increment(1);
}

/// Record a cache lookup. `result` is `hit`, `miss` or `expired`.
pub fn record_cache_lookup(result: &'static str) {
    metrics::counter!("hindsight_cache_lookups_total", "result" => result).increment(1);
}

/// Record a research run. `outcome` is `extracted`, `no_match` or `failed`.
pub fn record_research(outcome: &'static str) {
    metrics::counter!("hindsight_research_runs_total", "outcome" => outcome).increment(1);
}

/// Record a hook decision for a trigger category.
pub fn record_hint(category: &str, outcome: &'static str) {
    metrics::counter!(
        "hindsight_hints_total",
        "category" => category.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
