// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for vaxtrack.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

/// Top-level vaxtrack configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaxtrackConfig {
    /// Clinic identity, logging, and calendar settings.
    #[serde(default)]
    pub clinic: ClinicConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Schedule engine settings.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Clinic identity and calendar configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClinicConfig {
    /// Display name of the clinic.
    #[serde(default = "default_clinic_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// UTC offset of the clinic's calendar day, e.g. `+08:00`.
    ///
    /// Determines what "today" means when a schedule is created without an
    /// explicit start date.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

impl ClinicConfig {
    /// The parsed UTC offset, or `None` if `utc_offset` is malformed.
    pub fn fixed_offset(&self) -> Option<FixedOffset> {
        self.utc_offset.trim().parse::<FixedOffset>().ok()
    }
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            name: default_clinic_name(),
            log_level: default_log_level(),
            utc_offset: default_utc_offset(),
        }
    }
}

fn default_clinic_name() -> String {
    "vaxtrack".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("vaxtrack").join("vaxtrack.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("vaxtrack.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Schedule engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// How many times a read-modify-write is retried after losing a
    /// version race to a concurrent writer.
    #[serde(default = "default_max_update_retries")]
    pub max_update_retries: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            max_update_retries: default_max_update_retries(),
        }
    }
}

fn default_max_update_retries() -> u32 {
    3
}
