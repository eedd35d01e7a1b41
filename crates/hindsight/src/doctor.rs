// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hindsight doctor` command implementation.
//!
//! Checks the store, the embedding provider and the on-disk directories the
//! engine writes to, and prints one line per check.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use hindsight_config::model::HindsightConfig;
use hindsight_core::{HealthStatus, HindsightError};

use crate::engine::Engine;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run every check and print the report. Returns the number of failed checks.
pub async fn run_doctor(config: &HindsightConfig, plain: bool) -> usize {
    let use_color = !plain && std::io::stdout().is_terminal();
    let results = collect_checks(config).await;

    println!();
    println!("  hindsight doctor");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;
    for result in &results {
        match result.status {
            CheckStatus::Pass => {}
            CheckStatus::Warn => warn_count += 1,
            CheckStatus::Fail => fail_count += 1,
        }
        println!("{}", render_line(result, use_color));
    }

    println!();
    if fail_count + warn_count > 0 {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    fail_count
}

pub async fn collect_checks(config: &HindsightConfig) -> Vec<CheckResult> {
    let mut results = Vec::new();
    let start = Instant::now();
    match Engine::open(config.clone()).await {
        Ok(engine) => {
            results.push(CheckResult::new(
                "Database",
                CheckStatus::Pass,
                "opened",
                start,
            ));
            results.push(check_integrity(&engine).await);
            results.push(check_pending(&engine).await);
            results.push(check_embedder(&engine).await);
        }
        Err(e) => {
            results.push(CheckResult::new(
                "Database",
                CheckStatus::Fail,
                format!("cannot open {}: {e}", config.storage.database_path),
                start,
            ));
        }
    }
    results.push(check_dir("Cache dir", &config.cache.cache_dir).await);
    results.push(check_dir("Scratch dir", &config.research.scratch_dir).await);
    results.push(check_dir("Session dir", &config.trigger.state_dir).await);
    results
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red(), result.message.red()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

async fn check_integrity(engine: &Engine) -> CheckResult {
    let start = Instant::now();
    match engine.db.integrity_check().await {
        Ok(problems) if problems.is_empty() => {
            CheckResult::new("DB integrity", CheckStatus::Pass, "ok", start)
        }
        Ok(problems) => CheckResult::new(
            "DB integrity",
            CheckStatus::Fail,
            format!("{} problem(s): {}", problems.len(), problems.join("; ")),
            start,
        ),
        Err(e) => CheckResult::new("DB integrity", CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_pending(engine: &Engine) -> CheckResult {
    let start = Instant::now();
    match engine.memory.stats().await {
        Ok(stats) if stats.pending_embeddings == 0 => CheckResult::new(
            "Memories",
            CheckStatus::Pass,
            format!("{} stored, {} links", stats.memories, stats.relationships),
            start,
        ),
        Ok(stats) => CheckResult::new(
            "Memories",
            CheckStatus::Warn,
            format!(
                "{} of {} awaiting embedding (run `hindsight backfill`)",
                stats.pending_embeddings, stats.memories
            ),
            start,
        ),
        Err(e) => CheckResult::new("Memories", CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_embedder(engine: &Engine) -> CheckResult {
    let start = Instant::now();
    let Some(embedder) = &engine.embedder else {
        return CheckResult::new(
            "Embedding provider",
            CheckStatus::Warn,
            "disabled (search returns nothing)",
            start,
        );
    };
    let status: Result<HealthStatus, HindsightError> = embedder.health_check().await;
    match status {
        Ok(HealthStatus::Healthy) => CheckResult::new(
            "Embedding provider",
            CheckStatus::Pass,
            format!("{} reachable", engine.config.embedding.model),
            start,
        ),
        Ok(HealthStatus::Degraded(reason)) => {
            CheckResult::new("Embedding provider", CheckStatus::Warn, reason, start)
        }
        Ok(HealthStatus::Unhealthy(reason)) => CheckResult::new(
            "Embedding provider",
            CheckStatus::Fail,
            format!("{} ({})", reason, engine.config.embedding.base_url),
            start,
        ),
        Err(e) => CheckResult::new("Embedding provider", CheckStatus::Fail, e.to_string(), start),
    }
}

/// The directory exists (or can be created) and accepts a write.
async fn check_dir(name: &str, dir: &str) -> CheckResult {
    let start = Instant::now();
    let path = Path::new(dir);
    if let Err(e) = tokio::fs::create_dir_all(path).await {
        return CheckResult::new(name, CheckStatus::Fail, format!("{dir}: {e}"), start);
    }
    let probe = path.join(".doctor-probe");
    let writable = tokio::fs::write(&probe, b"ok").await;
    let _ = tokio::fs::remove_file(&probe).await;
    match writable {
        Ok(()) => CheckResult::new(name, CheckStatus::Pass, dir, start),
        Err(e) => CheckResult::new(name, CheckStatus::Fail, format!("{dir} not writable: {e}"), start),
    }
}
