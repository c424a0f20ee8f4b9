// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row shape of the `schedules` table and its conversion to records.
//!
//! Calendar dates are stored as `YYYY-MM-DD`, instants as RFC 3339 UTC with
//! microseconds so that text ordering matches time ordering.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use vaxtrack_core::{PatientRef, ScheduleId, VaxtrackError};
use vaxtrack_schedule::{DoseDay, DoseParts, ScheduleParts, ScheduleRecord, ScheduleStatus};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column order used by every SELECT in [`crate::queries::schedules`].
pub const SCHEDULE_COLUMNS: &str = "id, patient_ref, status, \
     day0_date, day0_completed, day0_completed_at, \
     day3_date, day3_completed, day3_completed_at, \
     day7_date, day7_completed, day7_completed_at, \
     day28_date, day28_completed, day28_completed_at, \
     created_at, updated_at, version";

/// One dose's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoseColumns {
    pub date: String,
    pub completed: bool,
    pub completed_at: Option<String>,
}

/// A `schedules` row as raw column values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub id: String,
    pub patient_ref: String,
    pub status: String,
    pub doses: [DoseColumns; 4],
    pub created_at: String,
    pub updated_at: String,
    pub version: i64,
}

impl ScheduleRow {
    /// Read a row selected with [`SCHEDULE_COLUMNS`].
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let dose = |base: usize| -> rusqlite::Result<DoseColumns> {
            Ok(DoseColumns {
                date: row.get(base)?,
                completed: row.get(base + 1)?,
                completed_at: row.get(base + 2)?,
            })
        };
        Ok(Self {
            id: row.get(0)?,
            patient_ref: row.get(1)?,
            status: row.get(2)?,
            doses: [dose(3)?, dose(6)?, dose(9)?, dose(12)?],
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
            version: row.get(17)?,
        })
    }

    /// Convert to a record, re-checking the completion invariants.
    pub fn into_record(self) -> Result<ScheduleRecord, VaxtrackError> {
        let status = self.status.parse::<ScheduleStatus>().map_err(|_| {
            VaxtrackError::InvalidRecord(format!(
                "schedule {}: unknown status `{}`",
                self.id, self.status
            ))
        })?;
        let version = u64::try_from(self.version).map_err(|_| {
            VaxtrackError::InvalidRecord(format!(
                "schedule {}: negative version {}",
                self.id, self.version
            ))
        })?;

        let [d0, d3, d7, d28] = self.doses;
        let doses = [
            dose_parts(DoseDay::Day0, d0)?,
            dose_parts(DoseDay::Day3, d3)?,
            dose_parts(DoseDay::Day7, d7)?,
            dose_parts(DoseDay::Day28, d28)?,
        ];

        ScheduleRecord::try_from(ScheduleParts {
            id: ScheduleId::from(self.id),
            patient_ref: PatientRef::new(self.patient_ref),
            status,
            doses,
            created_at: parse_instant(&self.created_at)?,
            updated_at: parse_instant(&self.updated_at)?,
            version,
        })
    }
}

impl TryFrom<&ScheduleRecord> for ScheduleRow {
    type Error = VaxtrackError;

    fn try_from(record: &ScheduleRecord) -> Result<Self, Self::Error> {
        let version = i64::try_from(record.version())
            .map_err(|_| VaxtrackError::Internal("schedule version overflow".into()))?;
        Ok(Self {
            id: record.id().to_string(),
            patient_ref: record.patient_ref().to_string(),
            status: record.status().as_str().to_string(),
            doses: record.doses().clone().map(|slot| DoseColumns {
                date: format_date(slot.due_date()),
                completed: slot.is_completed(),
                completed_at: slot.completed_at().map(format_instant),
            }),
            created_at: format_instant(record.created_at()),
            updated_at: format_instant(record.updated_at()),
            version,
        })
    }
}

fn dose_parts(day: DoseDay, cols: DoseColumns) -> Result<DoseParts, VaxtrackError> {
    Ok(DoseParts {
        day,
        due_date: parse_date(&cols.date)?,
        completed: cols.completed,
        completed_at: cols.completed_at.as_deref().map(parse_instant).transpose()?,
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_date(raw: &str) -> Result<NaiveDate, VaxtrackError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| VaxtrackError::InvalidRecord(format!("bad stored date `{raw}`: {e}")))
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, VaxtrackError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| VaxtrackError::InvalidRecord(format!("bad stored timestamp `{raw}`: {e}")))
}
