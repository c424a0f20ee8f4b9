// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Due-date arithmetic for the day 0/3/7/28 regimen.
//!
//! All arithmetic happens on [`NaiveDate`]: adding N days is calendar-day
//! addition, so DST transitions and UTC offsets between the start date and
//! the due date can never shift a result by a day. Instants only enter
//! through [`calendar_date_of`], which takes the date in the instant's own
//! offset.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vaxtrack_core::{Clock, PatientRef, ScheduleId, VaxtrackError};

use crate::dose::DoseDay;
use crate::record::ScheduleRecord;

/// The four due dates of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueDates {
    pub day0: NaiveDate,
    pub day3: NaiveDate,
    pub day7: NaiveDate,
    pub day28: NaiveDate,
}

impl DueDates {
    pub fn get(&self, day: DoseDay) -> NaiveDate {
        match day {
            DoseDay::Day0 => self.day0,
            DoseDay::Day3 => self.day3,
            DoseDay::Day7 => self.day7,
            DoseDay::Day28 => self.day28,
        }
    }
}

/// Compute all four due dates from a start date.
pub fn compute_due_dates(start: NaiveDate) -> Result<DueDates, VaxtrackError> {
    Ok(DueDates {
        day0: start,
        day3: add_days(start, DoseDay::Day3)?,
        day7: add_days(start, DoseDay::Day7)?,
        day28: add_days(start, DoseDay::Day28)?,
    })
}

fn add_days(start: NaiveDate, day: DoseDay) -> Result<NaiveDate, VaxtrackError> {
    let days = u64::from(day.offset_days());
    start
        .checked_add_days(Days::new(days))
        .ok_or(VaxtrackError::DateOutOfRange { start, days })
}

/// The calendar date of an instant, in the instant's own offset.
pub fn calendar_date_of<Tz: TimeZone>(instant: &DateTime<Tz>) -> NaiveDate {
    instant.date_naive()
}

/// Parse a start date from `YYYY-MM-DD` or an RFC 3339 timestamp.
///
/// For timestamps the time of day is dropped in the offset the timestamp was
/// written in, so `2025-03-08T23:30:00-05:00` is 2025-03-08, not the UTC date.
pub fn parse_start_date(input: &str) -> Result<NaiveDate, VaxtrackError> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(input)
        .map(|instant| calendar_date_of(&instant))
        .map_err(|_| {
            VaxtrackError::InvalidDate(format!(
                "`{input}` is neither YYYY-MM-DD nor an RFC 3339 timestamp"
            ))
        })
}

/// Builds new schedules and repairs due dates on existing ones.
pub struct ScheduleCalculator {
    clock: Arc<dyn Clock>,
}

impl ScheduleCalculator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Build a new schedule for `patient_ref`.
    ///
    /// `existing` is the patient-lookup result from the store. When it names
    /// a schedule, creation is refused with `DuplicateSchedule`. A missing
    /// `start_date` means the clinic's today.
    pub fn create_schedule(
        &self,
        patient_ref: PatientRef,
        start_date: Option<NaiveDate>,
        existing: Option<&ScheduleId>,
    ) -> Result<ScheduleRecord, VaxtrackError> {
        if let Some(existing) = existing {
            debug!(%patient_ref, schedule_id = %existing, "refusing duplicate schedule");
            return Err(VaxtrackError::DuplicateSchedule { patient_ref });
        }

        let start = start_date.unwrap_or_else(|| self.clock.today());
        let due = compute_due_dates(start)?;
        Ok(ScheduleRecord::new(
            ScheduleId::generate(),
            patient_ref,
            due,
            self.clock.now(),
        ))
    }

    /// Re-derive day 3/7/28 from the record's day 0.
    ///
    /// Completion state is untouched. `updated_at` moves only when a date
    /// actually changed, so running this twice gives the same record.
    pub fn recompute_due_dates(
        &self,
        record: &ScheduleRecord,
    ) -> Result<ScheduleRecord, VaxtrackError> {
        let due = compute_due_dates(record.dose(DoseDay::Day0).due_date())?;
        if due == record.due_dates() {
            return Ok(record.clone());
        }

        let mut next = record.clone();
        for day in DoseDay::ALL {
            next.dose_mut(day).set_due_date(due.get(day));
        }
        next.settle(self.clock.now());
        debug!(
            schedule_id = %next.id(),
            old = ?record.due_dates(),
            new = ?due,
            "recomputed due dates"
        );
        Ok(next)
    }
}
