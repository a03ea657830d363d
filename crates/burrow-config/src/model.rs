// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model.
//!
//! Every struct rejects unknown keys so typos surface at startup.

use serde::{Deserialize, Serialize};

/// Top-level configuration. All sections are optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BurrowConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// SQLite store settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the database file. Parent directories are created on open.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Journal in WAL mode. Turned off only for filesystems without shared memory.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a statement waits on a locked database before failing.
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

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("burrow").join("burrow.db").display().to_string())
        .unwrap_or_else(|| "burrow.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Eviction bounds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Rows older than this are removed by the age sweep.
    #[serde(default = "default_max_record_age_days")]
    pub max_record_age_days: u32,

    /// Breadcrumbs kept; the oldest are trimmed beyond this.
    #[serde(default = "default_max_breadcrumbs")]
    pub max_breadcrumbs: usize,

    /// How far back campaign history lookups reach.
    #[serde(default = "default_campaign_history_window_days")]
    pub campaign_history_window_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_record_age_days: default_max_record_age_days(),
            max_breadcrumbs: default_max_breadcrumbs(),
            campaign_history_window_days: default_campaign_history_window_days(),
        }
    }
}

fn default_max_record_age_days() -> u32 {
    30
}

fn default_max_breadcrumbs() -> usize {
    50
}

fn default_campaign_history_window_days() -> u32 {
    30
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
