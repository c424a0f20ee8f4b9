// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Files follow the XDG hierarchy, where `./vaxtrack.toml` beats
//! `~/.config/vaxtrack/vaxtrack.toml`, which beats `/etc/vaxtrack/vaxtrack.toml`.
//! Environment variables with the `VAXTRACK_` prefix override all of them.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::VaxtrackConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/vaxtrack/vaxtrack.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "vaxtrack.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/vaxtrack/vaxtrack.toml` (system-wide)
/// 3. `~/.config/vaxtrack/vaxtrack.toml` (user XDG config)
/// 4. `./vaxtrack.toml` (local directory)
/// 5. `VAXTRACK_*` environment variables
pub fn load_config() -> Result<VaxtrackConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<VaxtrackConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VaxtrackConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<VaxtrackConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VaxtrackConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(VaxtrackConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// `$XDG_CONFIG_HOME/vaxtrack/vaxtrack.toml`, if a config dir exists.
pub(crate) fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("vaxtrack/vaxtrack.toml"))
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// keys survive: `VAXTRACK_SCHEDULE_MAX_UPDATE_RETRIES` must map to
/// `schedule.max_update_retries`, not `schedule.max.update.retries`.
fn env_provider() -> Env {
    Env::prefixed("VAXTRACK_").map(|key| env_key_to_path(key.as_str()).into())
}

const SECTIONS: [&str; 3] = ["clinic", "storage", "schedule"];

/// Map a prefix-stripped env var name to a dotted config path.
///
/// Figment hands over the name in its original case, so `CLINIC_UTC_OFFSET`
/// becomes `clinic.utc_offset`. Only a leading section name is split off;
/// names without one are passed through lowercased.
pub(crate) fn env_key_to_path(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(field) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{field}");
        }
    }
    key
}
