// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schedule subcommand handlers.

use chrono::NaiveDate;
use vaxtrack_core::{PatientRef, VaxtrackError};
use vaxtrack_schedule::{
    DoseDay, ObservedAnimalStatus, ScheduleService, ScheduleStatus, ScheduleUpdate,
    parse_start_date,
};

use crate::render::{self, ScheduleView, Style};

/// `vaxtrack create`
pub async fn create(
    service: &ScheduleService,
    patient: &str,
    start_date: Option<NaiveDate>,
    style: Style,
) -> Result<(), VaxtrackError> {
    let record = service.create(PatientRef::new(patient), start_date).await?;
    print!(
        "{}",
        render::format_schedule(&record, ObservedAnimalStatus::Unknown, style)
    );
    Ok(())
}

/// `vaxtrack show`
pub async fn show(
    service: &ScheduleService,
    patient: &str,
    animal: ObservedAnimalStatus,
    json: bool,
    style: Style,
) -> Result<(), VaxtrackError> {
    let record = service.get(&PatientRef::new(patient)).await?;
    if json {
        println!("{}", render::to_json(&ScheduleView::new(&record, animal))?);
    } else {
        print!("{}", render::format_schedule(&record, animal, style));
    }
    Ok(())
}

/// `vaxtrack toggle`
pub async fn toggle(
    service: &ScheduleService,
    patient: &str,
    day: u32,
    style: Style,
) -> Result<(), VaxtrackError> {
    let record = service.toggle(&PatientRef::new(patient), day).await?;
    print!(
        "{}",
        render::format_schedule(&record, ObservedAnimalStatus::Unknown, style)
    );
    Ok(())
}

/// Assemble a [`ScheduleUpdate`] from the `update` flags.
///
/// Completions come first, then un-completions, then due dates, then the
/// requested status, so a day named by both `--complete` and `--incomplete`
/// ends up not given.
pub fn build_update(
    complete: &[u32],
    incomplete: &[u32],
    due: &[String],
    status: Option<ScheduleStatus>,
) -> Result<ScheduleUpdate, VaxtrackError> {
    let mut update = ScheduleUpdate::new();
    for &day in complete {
        update = update.completed(DoseDay::try_from(day)?, true);
    }
    for &day in incomplete {
        update = update.completed(DoseDay::try_from(day)?, false);
    }
    for assignment in due {
        let (day, date) = parse_due_assignment(assignment)?;
        update = update.due_date(day, date);
    }
    if let Some(status) = status {
        update = update.status(status);
    }
    Ok(update)
}

/// Parse `DAY=DATE`, e.g. `7=2025-01-10`.
pub fn parse_due_assignment(raw: &str) -> Result<(DoseDay, NaiveDate), VaxtrackError> {
    let (day, date) = raw
        .split_once('=')
        .ok_or_else(|| VaxtrackError::InvalidDate(format!("expected DAY=DATE, got `{raw}`")))?;
    let day: u32 = day
        .trim()
        .parse()
        .map_err(|_| VaxtrackError::InvalidDate(format!("`{day}` is not a dose day")))?;
    Ok((DoseDay::try_from(day)?, parse_start_date(date.trim())?))
}

/// `vaxtrack update`
pub async fn update(
    service: &ScheduleService,
    patient: &str,
    update: &ScheduleUpdate,
    style: Style,
) -> Result<(), VaxtrackError> {
    let record = service.update(&PatientRef::new(patient), update).await?;
    print!(
        "{}",
        render::format_schedule(&record, ObservedAnimalStatus::Unknown, style)
    );
    Ok(())
}

/// `vaxtrack recompute`
pub async fn recompute(
    service: &ScheduleService,
    patient: &str,
    style: Style,
) -> Result<(), VaxtrackError> {
    let record = service.recompute(&PatientRef::new(patient)).await?;
    print!(
        "{}",
        render::format_schedule(&record, ObservedAnimalStatus::Unknown, style)
    );
    Ok(())
}

/// `vaxtrack repair`
pub async fn repair(service: &ScheduleService) -> Result<(), VaxtrackError> {
    let report = service.repair_all().await?;
    println!(
        "  scanned {} schedules, repaired {}",
        report.scanned, report.repaired
    );
    Ok(())
}

/// `vaxtrack list`
pub async fn list(
    service: &ScheduleService,
    status: Option<ScheduleStatus>,
    json: bool,
    style: Style,
) -> Result<(), VaxtrackError> {
    let records = service.list(status).await?;
    if json {
        let views: Vec<ScheduleView> = records
            .iter()
            .map(|r| ScheduleView::new(r, ObservedAnimalStatus::Unknown))
            .collect();
        println!("{}", render::to_json(&views)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("  no schedules");
    }
    for record in &records {
        println!("{}", render::format_summary(record, style));
    }
    Ok(())
}

/// `vaxtrack overdue`
pub async fn overdue(
    service: &ScheduleService,
    as_of: Option<NaiveDate>,
    style: Style,
) -> Result<(), VaxtrackError> {
    let overdue = service.overdue(as_of).await?;
    if overdue.is_empty() {
        println!("  nothing overdue");
    }
    for entry in &overdue {
        let days: Vec<String> = entry.overdue.iter().map(ToString::to_string).collect();
        println!(
            "{}  overdue: {}",
            render::format_summary(&entry.record, style),
            days.join(", ")
        );
    }
    Ok(())
}

/// `vaxtrack remove`
pub async fn remove(service: &ScheduleService, patient: &str) -> Result<(), VaxtrackError> {
    service.remove(&PatientRef::new(patient)).await?;
    println!("  removed schedule for {patient}");
    Ok(())
}
