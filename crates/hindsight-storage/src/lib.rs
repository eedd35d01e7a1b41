// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Hindsight memory engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`. Typed queries live
//! next to the domain types in `hindsight-memory`.

pub mod database;
pub mod migrations;

pub use database::{map_tr_err, Database};
