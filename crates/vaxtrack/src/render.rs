// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal and JSON rendering of schedules.

use std::fmt::Write as _;
use std::io::IsTerminal;

use chrono::{DateTime, NaiveDate, Utc};
use colored::Colorize;
use serde::Serialize;
use vaxtrack_core::VaxtrackError;
use vaxtrack_schedule::{ObservedAnimalStatus, ScheduleRecord, ScheduleStatus};

/// Whether output may use ANSI colors.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub color: bool,
}

impl Style {
    /// Color unless `--plain` was given or stdout is not a terminal.
    pub fn detect(plain: bool) -> Self {
        if plain || !std::io::stdout().is_terminal() {
            return Self::plain();
        }
        Self { color: true }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }
}

/// JSON shape of one dose.
#[derive(Debug, Serialize)]
pub struct DoseView {
    pub day: u32,
    pub label: String,
    pub due_date: NaiveDate,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// JSON shape of a schedule for `show --json` and `list --json`.
#[derive(Debug, Serialize)]
pub struct ScheduleView {
    pub schedule_id: String,
    pub patient_ref: String,
    pub status: ScheduleStatus,
    pub doses: Vec<DoseView>,
    pub next_due: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl ScheduleView {
    pub fn new(record: &ScheduleRecord, observed: ObservedAnimalStatus) -> Self {
        Self {
            schedule_id: record.id().to_string(),
            patient_ref: record.patient_ref().to_string(),
            status: record.status(),
            doses: record
                .doses()
                .iter()
                .map(|slot| DoseView {
                    day: slot.day().into(),
                    label: slot.day().label(observed),
                    due_date: slot.due_date(),
                    completed: slot.is_completed(),
                    completed_at: slot.completed_at(),
                })
                .collect(),
            next_due: record.next_due().map(|slot| slot.due_date()),
            created_at: record.created_at(),
            updated_at: record.updated_at(),
            version: record.version(),
        }
    }
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String, VaxtrackError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| VaxtrackError::Internal(format!("failed to serialize output: {e}")))
}

fn status_text(status: ScheduleStatus, style: Style) -> String {
    let text = status.to_string();
    match (style.color, status) {
        (false, _) => text,
        (true, ScheduleStatus::Completed) => text.green().bold().to_string(),
        (true, ScheduleStatus::InProgress) => text.yellow().to_string(),
    }
}

/// Multi-line view of one schedule.
pub fn format_schedule(
    record: &ScheduleRecord,
    observed: ObservedAnimalStatus,
    style: Style,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {}  {}",
        record.patient_ref(),
        status_text(record.status(), style)
    );
    let _ = writeln!(out, "  schedule {}", record.id());
    let _ = writeln!(out, "  {}", "-".repeat(44));

    for slot in record.doses() {
        let mark = match (slot.is_completed(), style.color) {
            (true, true) => "[x]".green().to_string(),
            (true, false) => "[x]".to_string(),
            (false, _) => "[ ]".to_string(),
        };
        let given = slot
            .completed_at()
            .map(|at| format!("  given {}", at.format("%Y-%m-%d %H:%M UTC")))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {mark} {:<18} {}{given}",
            slot.day().label(observed),
            slot.due_date()
        );
    }

    if !record.has_consistent_due_dates() {
        let warning = "  due dates drifted from day 0; run `vaxtrack recompute`";
        let _ = writeln!(
            out,
            "{}",
            if style.color {
                warning.yellow().to_string()
            } else {
                warning.to_string()
            }
        );
    }
    out
}

/// One-line summary used by `list`.
pub fn format_summary(record: &ScheduleRecord, style: Style) -> String {
    let next = record
        .next_due()
        .map(|slot| format!("next {} on {}", slot.day(), slot.due_date()))
        .unwrap_or_else(|| "all doses given".to_string());
    format!(
        "  {:<20} {:<12} {}/4  {next}",
        record.patient_ref().as_str(),
        status_text(record.status(), style),
        record.completed_count()
    )
}

/// Print an error to stderr.
pub fn print_error(error: &VaxtrackError, style: Style) {
    if style.color {
        eprintln!("{} {error}", "error:".red().bold());
    } else {
        eprintln!("error: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use vaxtrack_core::{FixedClock, PatientRef};
    use vaxtrack_schedule::{DoseDay, ScheduleCalculator, ScheduleStateMachine};

    fn record() -> ScheduleRecord {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
        ));
        let calc = ScheduleCalculator::new(clock.clone());
        let machine = ScheduleStateMachine::new(clock);
        let record = calc
            .create_schedule(PatientRef::new("p-1"), NaiveDate::from_ymd_opt(2025, 1, 1), None)
            .unwrap();
        machine.toggle(&record, DoseDay::Day0)
    }

    #[test]
    fn plain_schedule_lists_all_doses() {
        let text = format_schedule(&record(), ObservedAnimalStatus::Alive, Style::plain());
        assert!(text.contains("p-1  in_progress"));
        assert!(text.contains("[x] Day 0"));
        assert!(text.contains("given 2025-01-01 09:00 UTC"));
        assert!(text.contains("[ ] Day 28 (Booster)"));
        assert!(text.contains("2025-01-29"));
        assert!(!text.contains("drifted"));
    }

    #[test]
    fn summary_names_next_dose() {
        let line = format_summary(&record(), Style::plain());
        assert!(line.contains("1/4"));
        assert!(line.contains("next Day 3 on 2025-01-04"));
    }

    #[test]
    fn json_view_has_labels_and_next_due() {
        let view = ScheduleView::new(&record(), ObservedAnimalStatus::Unknown);
        let json: serde_json::Value = serde_json::from_str(&to_json(&view).unwrap()).unwrap();
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["doses"][3]["label"], "Day 28");
        assert_eq!(json["doses"][0]["completed"], true);
        assert_eq!(json["next_due"], "2025-01-04");
    }
}
