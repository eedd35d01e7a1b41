// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./hindsight.toml` > `~/.config/hindsight/hindsight.toml` >
//! `/etc/hindsight/hindsight.toml`, with `HINDSIGHT_` environment overrides.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::HindsightConfig;

/// Sections that may be addressed through `HINDSIGHT_<SECTION>_<KEY>`.
const ENV_SECTIONS: &[&str] = &[
    "log",
    "storage",
    "embedding",
    "memory",
    "cache",
    "research",
    "trigger",
];

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/hindsight/hindsight.toml";

/// Config file in the current directory.
pub const LOCAL_CONFIG_FILE: &str = "hindsight.toml";

/// User config file under the XDG config directory.
pub fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("hindsight").join("hindsight.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/hindsight/hindsight.toml`
/// 3. `~/.config/hindsight/hindsight.toml`
/// 4. `./hindsight.toml`
/// 5. `HINDSIGHT_*` environment variables
pub fn load_config() -> Result<HindsightConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<HindsightConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HindsightConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HindsightConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HindsightConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(HindsightConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Map `HINDSIGHT_SECTION_KEY` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `HINDSIGHT_STORAGE_DATABASE_PATH` maps to `storage.database_path`.
fn env_provider() -> Env {
    Env::prefixed("HINDSIGHT_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key
}
