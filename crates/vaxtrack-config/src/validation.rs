// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use crate::diagnostic::ConfigError;
use crate::model::VaxtrackConfig;

/// Levels accepted by `clinic.log_level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Upper bound for `schedule.max_update_retries`.
pub const MAX_UPDATE_RETRIES_LIMIT: u32 = 20;

/// Validate a deserialized configuration.
///
/// Collects every problem instead of stopping at the first one.
pub fn validate_config(config: &VaxtrackConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.clinic.name.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "clinic.name must not be empty".to_string(),
        });
    }

    let level = config.clinic.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "clinic.log_level `{}` is not one of {}",
                config.clinic.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.clinic.fixed_offset().is_none() {
        errors.push(ConfigError::Validation {
            message: format!(
                "clinic.utc_offset `{}` is not a UTC offset like +08:00 or -05:00",
                config.clinic.utc_offset
            ),
        });
    }

    if config.schedule.max_update_retries > MAX_UPDATE_RETRIES_LIMIT {
        errors.push(ConfigError::Validation {
            message: format!(
                "schedule.max_update_retries must be at most {MAX_UPDATE_RETRIES_LIMIT}, got {}",
                config.schedule.max_update_retries
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
