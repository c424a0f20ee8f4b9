// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `vaxtrack status` command implementation.

use colored::Colorize;
use serde::Serialize;
use vaxtrack_config::VaxtrackConfig;
use vaxtrack_core::{HealthStatus, VaxtrackError};
use vaxtrack_schedule::ScheduleStore;
use vaxtrack_storage::SqliteScheduleStore;

use crate::render::{self, Style};

/// Structured output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub clinic: String,
    pub utc_offset: String,
    pub store: String,
    pub database_path: String,
    pub health: String,
    pub schedules: u64,
}

/// Run the `vaxtrack status` command.
pub async fn run_status(
    store: &SqliteScheduleStore,
    config: &VaxtrackConfig,
    json: bool,
    style: Style,
) -> Result<(), VaxtrackError> {
    let health = store.health_check().await?;
    let response = StatusResponse {
        clinic: config.clinic.name.clone(),
        utc_offset: config.clinic.utc_offset.clone(),
        store: store.name().to_string(),
        database_path: store.database_path().to_string(),
        health: health.to_string(),
        schedules: store.count().await?,
    };

    if json {
        println!("{}", render::to_json(&response)?);
    } else {
        print_status(&response, &health, style);
    }
    Ok(())
}

fn print_status(response: &StatusResponse, health: &HealthStatus, style: Style) {
    let health_text = match (style.color, health) {
        (false, _) => response.health.clone(),
        (true, HealthStatus::Healthy) => response.health.green().to_string(),
        (true, HealthStatus::Degraded(_)) => response.health.yellow().to_string(),
        (true, HealthStatus::Unhealthy(_)) => response.health.red().to_string(),
    };

    println!();
    println!("  vaxtrack status");
    println!("  {}", "-".repeat(44));
    println!("  clinic:     {} (UTC{})", response.clinic, response.utc_offset);
    println!("  store:      {} at {}", response.store, response.database_path);
    println!("  health:     {health_text}");
    println!("  schedules:  {}", response.schedules);
    println!();
}
