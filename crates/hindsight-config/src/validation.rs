// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: threshold ranges,
//! non-empty paths, positive sizes, and well-formed trigger rules.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{HindsightConfig, TriggerRuleConfig};

/// Trigger category names accepted in `[[trigger.rules]]`.
pub const TRIGGER_CATEGORIES: &[&str] = &[
    "past-work",
    "decision-lookup",
    "bug-lookup",
    "technical-topic",
    "decision",
    "preference",
    "setup",
];

/// Priority names accepted in `[[trigger.rules]]`.
pub const TRIGGER_PRIORITIES: &[&str] = &["critical", "high", "medium", "low"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &HindsightConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    for (name, value) in [
        ("storage.database_path", &config.storage.database_path),
        ("cache.cache_dir", &config.cache.cache_dir),
        ("research.scratch_dir", &config.research.scratch_dir),
        ("trigger.state_dir", &config.trigger.state_dir),
        ("trigger.hint_log_path", &config.trigger.hint_log_path),
    ] {
        if value.trim().is_empty() {
            fail(format!("{name} must not be empty"));
        }
    }

    let threshold = config.memory.similarity_threshold;
    if !(-1.0..=1.0).contains(&threshold) {
        fail(format!(
            "memory.similarity_threshold must be within [-1.0, 1.0], got {threshold}"
        ));
    }

    for (name, value) in [
        ("memory.top_k", config.memory.top_k),
        ("memory.backfill_batch", config.memory.backfill_batch),
        ("embedding.max_input_chars", config.embedding.max_input_chars),
        ("research.max_fetch_chars", config.research.max_fetch_chars),
        ("research.max_extract_chars", config.research.max_extract_chars),
        ("research.summary_chars", config.research.summary_chars),
        ("trigger.max_results", config.trigger.max_results),
        ("trigger.max_hint_chars", config.trigger.max_hint_chars),
        ("trigger.breaker_threshold", config.trigger.breaker_threshold),
        ("trigger.breaker_window", config.trigger.breaker_window),
    ] {
        if value == 0 {
            fail(format!("{name} must be at least 1"));
        }
    }

    for (name, value) in [
        ("embedding.timeout_secs", config.embedding.timeout_secs),
        ("research.fetch_timeout_secs", config.research.fetch_timeout_secs),
        ("cache.embedding_ttl_secs", config.cache.embedding_ttl_secs),
    ] {
        if value == 0 {
            fail(format!("{name} must be positive"));
        }
    }

    if config.embedding.dimensions == Some(0) {
        fail("embedding.dimensions must be positive when set".to_string());
    }

    let similarity = config.trigger.breaker_similarity;
    if !(0.0..=1.0).contains(&similarity) {
        fail(format!(
            "trigger.breaker_similarity must be within [0.0, 1.0], got {similarity}"
        ));
    }

    for ip in &config.research.allowed_private_ips {
        if ip.parse::<std::net::IpAddr>().is_err() {
            fail(format!(
                "research.allowed_private_ips entry `{ip}` is not a valid IP address"
            ));
        }
    }

    if let Err(url_error) = check_base_url(&config.embedding.base_url) {
        fail(url_error);
    }

    let mut seen = HashSet::new();
    for (index, rule) in config.trigger.rules.iter().enumerate() {
        validate_rule(index, rule, &mut seen, &mut fail);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_base_url(base_url: &str) -> Result<(), String> {
    let trimmed = base_url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(())
    } else {
        Err(format!(
            "embedding.base_url `{base_url}` must start with http:// or https://"
        ))
    }
}

fn validate_rule(
    index: usize,
    rule: &TriggerRuleConfig,
    seen: &mut HashSet<String>,
    fail: &mut impl FnMut(String),
) {
    let prefix = format!("trigger.rules[{index}]");

    if !TRIGGER_CATEGORIES.contains(&rule.category.as_str()) {
        fail(format!(
            "{prefix}.category `{}` is not one of: {}",
            rule.category,
            TRIGGER_CATEGORIES.join(", ")
        ));
    } else if !seen.insert(rule.category.clone()) {
        fail(format!(
            "{prefix}.category `{}` is declared more than once",
            rule.category
        ));
    }

    if !TRIGGER_PRIORITIES.contains(&rule.priority.as_str()) {
        fail(format!(
            "{prefix}.priority `{}` is not one of: {}",
            rule.priority,
            TRIGGER_PRIORITIES.join(", ")
        ));
    }

    if rule.keywords.is_empty() && rule.patterns.is_empty() {
        fail(format!("{prefix} needs at least one keyword or pattern"));
    }

    if rule.cooldown_turns.is_some() && rule.cooldown_secs.is_some() {
        fail(format!(
            "{prefix} sets both cooldown_turns and cooldown_secs; pick one"
        ));
    }

    for pattern in &rule.patterns {
        if let Err(e) = regex::Regex::new(pattern) {
            fail(format!("{prefix}.patterns `{pattern}` does not compile: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(category: &str) -> TriggerRuleConfig {
        TriggerRuleConfig {
            category: category.to_string(),
            keywords: vec!["remember".to_string()],
            patterns: vec![],
            priority: "high".to_string(),
            cooldown_turns: Some(2),
            cooldown_secs: None,
            min_chars: None,
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&HindsightConfig::default()).is_ok());
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let mut config = HindsightConfig::default();
        config.memory.similarity_threshold = 1.5;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("similarity_threshold"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = HindsightConfig::default();
        config.memory.top_k = 0;
        config.storage.database_path = "  ".to_string();
        config.research.allowed_private_ips = vec!["not-an-ip".to_string()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn rule_with_bad_category_and_pattern() {
        let mut config = HindsightConfig::default();
        let mut bad = rule("past-wrk");
        bad.patterns = vec!["(unclosed".to_string()];
        config.trigger.rules = vec![bad];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn duplicate_rule_category_is_rejected() {
        let mut config = HindsightConfig::default();
        config.trigger.rules = vec![rule("decision"), rule("decision")];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("more than once"));
    }

    #[test]
    fn rules_from_toml_validate() {
        let toml_str = r#"
[memory]
similarity_threshold = 0.45

[[trigger.rules]]
category = "bug-lookup"
keywords = ["stack trace"]
patterns = ['\bpanic(ked)?\b']
priority = "critical"
cooldown_turns = 2
"#;
        let config: HindsightConfig = toml::from_str(toml_str).unwrap();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.trigger.rules.len(), 1);
    }

    #[test]
    fn rule_without_matchers_is_rejected() {
        let toml_str = r#"
[[trigger.rules]]
category = "setup"
"#;
        let config: HindsightConfig = toml::from_str(toml_str).unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("keyword or pattern"));
    }

    #[test]
    fn both_cooldowns_is_rejected() {
        let mut config = HindsightConfig::default();
        let mut r = rule("setup");
        r.cooldown_secs = Some(30);
        config.trigger.rules = vec![r];
        assert!(validate_config(&config).is_err());
    }
}
