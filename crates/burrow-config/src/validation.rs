// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use crate::diagnostic::ConfigError;
use crate::model::BurrowConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const MAX_BUSY_TIMEOUT_MS: u64 = 600_000;

/// Validate a deserialized configuration.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &BurrowConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.busy_timeout_ms == 0 || config.storage.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "storage.busy_timeout_ms must be between 1 and {MAX_BUSY_TIMEOUT_MS}, got {}",
                config.storage.busy_timeout_ms
            ),
        });
    }

    if config.retention.max_record_age_days == 0 {
        errors.push(ConfigError::Validation {
            message: "retention.max_record_age_days must be at least 1".to_string(),
        });
    }

    if config.retention.max_breadcrumbs == 0 {
        errors.push(ConfigError::Validation {
            message: "retention.max_breadcrumbs must be at least 1".to_string(),
        });
    }

    let level = config.logging.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
