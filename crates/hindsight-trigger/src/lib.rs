// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decides when to read from or remind about writing to memory.
//!
//! ## Architecture
//!
//! - **rules**: data-driven trigger rules with priority and cooldown
//! - **classifier**: single matcher over an ordered rule set
//! - **session**: per-session turn counter and cooldown marks on disk
//! - **hint_log** / **breaker**: rolling hint history and loop suppression
//! - **orchestrator**: glues the above to memory search for one host event

pub mod breaker;
pub mod classifier;
pub mod hint_log;
pub mod orchestrator;
pub mod rules;
pub mod session;

pub use breaker::CircuitBreaker;
pub use classifier::{Classification, TriggerClassifier};
pub use hint_log::{HintLog, HintRecord};
pub use orchestrator::{HookEvent, HookResponse, InjectionOrchestrator};
pub use rules::{Cooldown, Intent, Priority, RuleMatch, RuleSet, TriggerCategory, TriggerRule};
pub use session::{Phase, SessionState, SessionStore};
