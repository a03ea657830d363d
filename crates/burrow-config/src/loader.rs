// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered loading with figment.
//!
//! Merge order, later wins: compiled defaults, `/etc/burrow/burrow.toml`,
//! `$XDG_CONFIG_HOME/burrow/burrow.toml`, `./burrow.toml`, `BURROW_*` env.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::BurrowConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/burrow/burrow.toml";
pub(crate) const LOCAL_CONFIG: &str = "burrow.toml";

/// Sections that env keys are split on. Key names inside a section keep
/// their underscores.
const SECTIONS: &[&str] = &["storage", "retention", "logging"];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("burrow").join(LOCAL_CONFIG))
}

/// Load from the full file hierarchy with env overrides.
pub fn load_config() -> Result<BurrowConfig, figment::Error> {
    build_figment().extract()
}

/// Load from a TOML string over the defaults. No files, no env.
pub fn load_config_from_str(toml_content: &str) -> Result<BurrowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BurrowConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load from one explicit file with env overrides.
pub fn load_config_from_path(path: &Path) -> Result<BurrowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BurrowConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BurrowConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// `BURROW_STORAGE_BUSY_TIMEOUT_MS` maps to `storage.busy_timeout_ms`,
/// not `storage.busy.timeout.ms`.
fn env_provider() -> Env {
    Env::prefixed("BURROW_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
