// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hindsight - persistent semantic memory for coding agents.
//!
//! Binary entry point. Logs go to stderr; stdout carries only command output,
//! which for `hook` is the JSON response read by the host agent.

mod doctor;
mod engine;
mod hook;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use hindsight_config::model::HindsightConfig;
use hindsight_core::recording::register_metrics;
use hindsight_core::HindsightError;
use hindsight_memory::{MemoryCategory, Metadata, SaveOutcome};

use crate::engine::{resolve_scope, Engine};

/// Hindsight - persistent semantic memory for coding agents.
#[derive(Parser, Debug)]
#[command(name = "hindsight", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Handle one prompt event from the host agent (JSON on stdin).
    Hook,
    /// Check the store, the embedding provider and data directories.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    #[command(flatten)]
    Store(StoreCommands),
}

/// Subcommands that operate on an opened store.
#[derive(Subcommand, Debug)]
enum StoreCommands {
    /// Save a memory.
    Save {
        /// Scope name; defaults to the current directory's project.
        #[arg(long)]
        scope: Option<String>,
        #[arg(long, default_value = "learning")]
        category: MemoryCategory,
        content: String,
    },
    /// Search memories by meaning.
    Search {
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        top_k: Option<usize>,
        /// Print hits as JSON.
        #[arg(long)]
        json: bool,
        query: String,
    },
    /// Relate two memories.
    Link {
        source_id: String,
        target_id: String,
        #[arg(long, default_value = "related")]
        relation: String,
        #[arg(long, default_value_t = 1.0)]
        weight: f64,
    },
    /// Store or search session summaries.
    Summary {
        #[arg(long)]
        scope: Option<String>,
        /// Search summaries for this text instead of storing it.
        #[arg(long)]
        search: bool,
        text: String,
    },
    /// Fetch a source, keep what matches the query, and discard the rest.
    Research {
        #[arg(long)]
        scope: Option<String>,
        /// URL or local path.
        source: String,
        query: String,
    },
    /// Embed memories saved while the provider was unavailable.
    Backfill {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show store counters.
    Stats,
    /// Manage the TTL cache.
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Remove expired, corrupt and abandoned cache files.
    Sweep {
        /// Override `cache.sweep_max_age_secs`.
        #[arg(long)]
        max_age_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => hindsight_config::load_and_validate_path(path),
        None => hindsight_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            hindsight_config::render_errors(&errors);
            // A broken config must not block the host agent.
            return if matches!(cli.command, Commands::Hook) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
    };

    init_tracing(&config.log.level);
    register_metrics();

    match run(cli.command, config).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("hindsight: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing subscriber on stderr.
///
/// `RUST_LOG` wins; otherwise `hindsight*` targets log at `log_level` and
/// everything else at `warn`.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

/// `hindsight` is a prefix of every workspace crate's target.
fn filter_directive(log_level: &str) -> String {
    format!("hindsight={log_level},warn")
}

async fn run(command: Commands, config: HindsightConfig) -> Result<ExitCode, HindsightError> {
    match command {
        Commands::Hook => {
            hook::run_hook(config).await;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Doctor { plain } => {
            let failed = doctor::run_doctor(&config, plain).await;
            Ok(if failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Store(command) => {
            let cwd = std::env::current_dir()?;
            let engine = Engine::open(config).await?;
            run_store(command, &engine, &cwd).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_store(
    command: StoreCommands,
    engine: &Engine,
    cwd: &Path,
) -> Result<(), HindsightError> {
    match command {
        StoreCommands::Save {
            scope,
            category,
            content,
        } => {
            let scope = resolve_scope(scope.as_deref(), cwd);
            let saved = engine
                .memory
                .save(&scope, category, &content, Metadata::new())
                .await?;
            let verb = match saved.outcome {
                SaveOutcome::Created => "saved",
                SaveOutcome::Merged => "already known",
            };
            let pending = if saved.embedded {
                ""
            } else {
                ", embedding pending"
            };
            println!(
                "{verb} {} in {scope} (used {}x{pending})",
                saved.id, saved.usage_count
            );
        }
        StoreCommands::Search {
            scope,
            top_k,
            json,
            query,
        } => {
            let scope = resolve_scope(scope.as_deref(), cwd);
            let hits = engine.memory.search(&scope, &query, top_k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("no memories in {scope} match");
            } else {
                for hit in &hits {
                    let link = if hit.via_link { " (linked)" } else { "" };
                    println!(
                        "[{}|{:>3.0}%] {}{link}\n    {}",
                        hit.category,
                        hit.similarity * 100.0,
                        hit.content,
                        hit.id
                    );
                }
            }
        }
        StoreCommands::Link {
            source_id,
            target_id,
            relation,
            weight,
        } => {
            let edge_id = engine
                .memory
                .link(&source_id, &target_id, &relation, weight)
                .await?;
            println!("linked {source_id} -[{relation}]-> {target_id} (edge {edge_id})");
        }
        StoreCommands::Summary {
            scope,
            search,
            text,
        } => {
            let scope = resolve_scope(scope.as_deref(), cwd);
            if search {
                let top_k = engine.config.memory.top_k;
                for hit in engine.memory.search_sessions(&scope, &text, top_k).await? {
                    println!(
                        "[{:>3.0}%] {} {}",
                        hit.similarity * 100.0,
                        hit.created_at,
                        hit.summary
                    );
                }
            } else {
                let id = engine.memory.save_session_summary(&scope, &text).await?;
                println!("session summary {id} saved in {scope}");
            }
        }
        StoreCommands::Research {
            scope,
            source,
            query,
        } => {
            let scope = resolve_scope(scope.as_deref(), cwd);
            let report = engine.research()?.research(&source, &query, &scope).await?;
            if report.extracted.is_empty() {
                println!("nothing in {source} matches \"{query}\"");
            } else {
                println!("{}", report.extracted);
                if let Some(id) = report.memory_id {
                    println!("\nsummary saved as {id}");
                }
                if report.source_truncated {
                    println!("(source was truncated before extraction)");
                }
            }
        }
        StoreCommands::Backfill { limit } => {
            let limit = limit.unwrap_or(engine.config.memory.backfill_batch);
            let report = engine.memory.backfill(limit).await?;
            println!(
                "embedded {}, still pending {}",
                report.embedded, report.failed
            );
        }
        StoreCommands::Stats => {
            let stats = engine.memory.stats().await?;
            println!("memories:            {}", stats.memories);
            println!("pending embeddings:  {}", stats.pending_embeddings);
            println!("relationships:       {}", stats.relationships);
            println!("session summaries:   {}", stats.sessions);
        }
        StoreCommands::Cache {
            command: CacheCommands::Sweep { max_age_secs },
        } => {
            let max_age =
                Duration::from_secs(max_age_secs.unwrap_or(engine.config.cache.sweep_max_age_secs));
            let removed = engine.cache().await?.sweep(max_age).await?;
            println!("removed {removed} cache entries");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn save_parses_category() {
        let cli = Cli::try_parse_from([
            "hindsight",
            "save",
            "--category",
            "problem-solution",
            "restart the worker after migrations",
        ])
        .unwrap();
        match cli.command {
            Commands::Store(StoreCommands::Save { category, .. }) => {
                assert_eq!(category, MemoryCategory::ProblemSolution)
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!(Cli::try_parse_from(["hindsight", "save", "--category", "gossip", "x"]).is_err());
    }

    #[test]
    fn filter_directive_parses() {
        let directive = filter_directive("debug");
        assert_eq!(directive, "hindsight=debug,warn");
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    #[serial_test::serial]
    fn env_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hindsight.toml");
        std::fs::write(&path, "[memory]\ntop_k = 7\n").unwrap();

        unsafe { std::env::set_var("HINDSIGHT_LOG_LEVEL", "debug") };
        let loaded = hindsight_config::load_and_validate_path(&path);
        unsafe { std::env::remove_var("HINDSIGHT_LOG_LEVEL") };

        let config = loaded.unwrap();
        assert_eq!(config.memory.top_k, 7);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    #[serial_test::serial]
    fn binary_loads_config_defaults() {
        let config = hindsight_config::load_and_validate_str("").unwrap();
        assert_eq!(config.memory.top_k, 5);
        assert!((config.memory.similarity_threshold - 0.3).abs() < f64::EPSILON);
    }
}
