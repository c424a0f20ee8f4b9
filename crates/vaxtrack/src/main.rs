// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! vaxtrack - post-exposure vaccination schedules for bite clinics.
//!
//! Binary entry point: parses the command line, loads configuration, opens
//! the SQLite store and dispatches to the command handlers.

mod commands;
mod render;
mod status;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use vaxtrack_config::VaxtrackConfig;
use vaxtrack_core::{SystemClock, VaxtrackError};
use vaxtrack_schedule::{ObservedAnimalStatus, ScheduleService, ScheduleStatus, parse_start_date};
use vaxtrack_storage::SqliteScheduleStore;

/// vaxtrack - post-exposure vaccination schedules.
#[derive(Parser, Debug)]
#[command(name = "vaxtrack", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard lookup.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a schedule for a patient (day 0 defaults to today).
    Create {
        patient: String,
        /// First-dose date: YYYY-MM-DD or an RFC 3339 timestamp.
        #[arg(long, value_parser = parse_date_arg)]
        start_date: Option<NaiveDate>,
    },
    /// Show a patient's schedule.
    Show {
        patient: String,
        /// Observed state of the biting animal, used for dose labels.
        #[arg(long, default_value = "unknown")]
        animal: ObservedAnimalStatus,
        #[arg(long)]
        json: bool,
    },
    /// Flip a dose between given and not given.
    Toggle {
        patient: String,
        /// Dose day: 0, 3, 7 or 28.
        day: u32,
    },
    /// Set several fields at once.
    Update {
        patient: String,
        /// Mark a dose day as given.
        #[arg(long = "complete", value_name = "DAY")]
        complete: Vec<u32>,
        /// Mark a dose day as not given.
        #[arg(long = "incomplete", value_name = "DAY")]
        incomplete: Vec<u32>,
        /// Override a due date, e.g. `--due 7=2025-01-10`.
        #[arg(long = "due", value_name = "DAY=DATE")]
        due: Vec<String>,
        /// Requested status. Ignored when it contradicts the doses.
        #[arg(long)]
        status: Option<ScheduleStatus>,
    },
    /// Re-derive day 3/7/28 from day 0 for one patient.
    Recompute { patient: String },
    /// Repair every schedule whose due dates drifted or whose stored status
    /// contradicts its doses.
    Repair,
    /// List schedules, newest first.
    List {
        #[arg(long)]
        status: Option<ScheduleStatus>,
        #[arg(long)]
        json: bool,
    },
    /// Schedules with doses past due.
    Overdue {
        /// Reference date (defaults to the clinic's today).
        #[arg(long, value_parser = parse_date_arg)]
        as_of: Option<NaiveDate>,
    },
    /// Remove a patient's schedule.
    Remove { patient: String },
    /// Show store health and configuration.
    Status {
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Subcommand name as typed on the command line.
    fn name(&self) -> &'static str {
        match self {
            Commands::Create { .. } => "create",
            Commands::Show { .. } => "show",
            Commands::Toggle { .. } => "toggle",
            Commands::Update { .. } => "update",
            Commands::Recompute { .. } => "recompute",
            Commands::Repair => "repair",
            Commands::List { .. } => "list",
            Commands::Overdue { .. } => "overdue",
            Commands::Remove { .. } => "remove",
            Commands::Status { .. } => "status",
        }
    }
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_start_date(raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => vaxtrack_config::load_and_validate_path(path),
        None => vaxtrack_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            vaxtrack_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.clinic.log_level);

    let style = render::Style::detect(cli.plain);
    if let Err(e) = run(cli, &config, style).await {
        render::print_error(&e, style);
        std::process::exit(1);
    }
}

async fn run(
    cli: Cli,
    config: &VaxtrackConfig,
    out: render::Style,
) -> Result<(), VaxtrackError> {
    let offset = config.clinic.fixed_offset().ok_or_else(|| {
        VaxtrackError::Config(format!("bad clinic.utc_offset `{}`", config.clinic.utc_offset))
    })?;

    let store = Arc::new(SqliteScheduleStore::new(config.storage.clone()));
    store.initialize().await?;
    info!(
        clinic = %config.clinic.name,
        database = %config.storage.database_path,
        "schedule store opened"
    );
    let service = ScheduleService::new(
        store.clone(),
        Arc::new(SystemClock::new(offset)),
        &config.schedule,
    );

    debug!(command = cli.command.name(), "dispatching command");
    let result = match cli.command {
        Commands::Create {
            patient,
            start_date,
        } => commands::create(&service, &patient, start_date, out).await,
        Commands::Show {
            patient,
            animal,
            json,
        } => commands::show(&service, &patient, animal, json, out).await,
        Commands::Toggle { patient, day } => commands::toggle(&service, &patient, day, out).await,
        Commands::Update {
            patient,
            complete,
            incomplete,
            due,
            status,
        } => match commands::build_update(&complete, &incomplete, &due, status) {
            Ok(update) => commands::update(&service, &patient, &update, out).await,
            Err(e) => Err(e),
        },
        Commands::Recompute { patient } => commands::recompute(&service, &patient, out).await,
        Commands::Repair => commands::repair(&service).await,
        Commands::List { status, json } => commands::list(&service, status, json, out).await,
        Commands::Overdue { as_of } => commands::overdue(&service, as_of, out).await,
        Commands::Remove { patient } => commands::remove(&service, &patient).await,
        Commands::Status { json } => status::run_status(&store, config, json, out).await,
    };

    store.close().await?;
    debug!("schedule store closed");
    result
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vaxtrack={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
