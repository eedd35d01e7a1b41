// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hindsight hook`: one prompt event in on stdin, at most one response out
//! on stdout.
//!
//! The host agent blocks on this process, so nothing here exits non-zero.
//! Every failure, from unparsable input to an unopenable database, becomes
//! an empty stdout.

use tokio::io::AsyncReadExt;
use tracing::{error, warn};

use hindsight_config::model::HindsightConfig;
use hindsight_trigger::{HookEvent, HookResponse};

use crate::engine::Engine;

pub async fn run_hook(config: HindsightConfig) {
    let mut raw = String::new();
    if let Err(e) = tokio::io::stdin().read_to_string(&mut raw).await {
        warn!(error = %e, "failed to read hook event");
        return;
    }

    let response = respond(config, &raw).await;
    if response.is_pass_through() {
        return;
    }
    match serde_json::to_string(&response) {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "failed to encode hook response"),
    }
}

/// Decide the response for one raw event.
pub async fn respond(config: HindsightConfig, raw: &str) -> HookResponse {
    let event: HookEvent = match serde_json::from_str(raw) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "unparsable hook event, passing through");
            return HookResponse::pass_through();
        }
    };

    let engine = match Engine::open(config).await {
        Ok(engine) => engine,
        Err(e) => {
            warn!(error = %e, "memory engine unavailable, passing through");
            return HookResponse::pass_through();
        }
    };
    match engine.orchestrator() {
        Ok(orchestrator) => orchestrator.handle(&event).await,
        Err(e) => {
            error!(error = %e, "trigger rules invalid, passing through");
            HookResponse::pass_through()
        }
    }
}
