// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-patient schedule record and its persisted shape.
//!
//! Fields are private. A record is built by the calculator, changed by the
//! state machine, or restored from [`ScheduleParts`], which re-checks the
//! completion invariants on the way in.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::warn;
use vaxtrack_core::{PatientRef, ScheduleId, VaxtrackError};

use crate::calculator::DueDates;
use crate::dose::{DoseDay, DoseSlot};
use crate::state::derive_status;

/// Aggregate status of a schedule, derived from the four completion flags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    InProgress,
    Completed,
}

impl ScheduleStatus {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::InProgress => "in_progress",
            ScheduleStatus::Completed => "completed",
        }
    }
}

/// A patient's vaccination schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleParts", into = "ScheduleParts")]
pub struct ScheduleRecord {
    id: ScheduleId,
    patient_ref: PatientRef,
    status: ScheduleStatus,
    doses: [DoseSlot; 4],
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
    /// Set when restored from parts whose status disagreed with the flags.
    stale_status: bool,
}

impl ScheduleRecord {
    /// A fresh, fully pending record.
    pub(crate) fn new(
        id: ScheduleId,
        patient_ref: PatientRef,
        due: DueDates,
        now: DateTime<Utc>,
    ) -> Self {
        let doses = DoseDay::ALL.map(|day| DoseSlot::pending(day, due.get(day)));
        Self {
            id,
            patient_ref,
            status: derive_status(&doses),
            doses,
            created_at: now,
            updated_at: now,
            version: 0,
            stale_status: false,
        }
    }

    pub fn id(&self) -> &ScheduleId {
        &self.id
    }

    pub fn patient_ref(&self) -> &PatientRef {
        &self.patient_ref
    }

    pub fn status(&self) -> ScheduleStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == ScheduleStatus::Completed
    }

    /// All four doses in administration order.
    pub fn doses(&self) -> &[DoseSlot; 4] {
        &self.doses
    }

    pub fn dose(&self, day: DoseDay) -> &DoseSlot {
        &self.doses[day.index()]
    }

    pub fn due_dates(&self) -> DueDates {
        DueDates {
            day0: self.dose(DoseDay::Day0).due_date(),
            day3: self.dose(DoseDay::Day3).due_date(),
            day7: self.dose(DoseDay::Day7).due_date(),
            day28: self.dose(DoseDay::Day28).due_date(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Optimistic-concurrency version assigned by the store.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Copy of this record carrying a store-assigned version.
    ///
    /// Only stores call this, once the record is persisted; the engine never
    /// changes versions.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self.stale_status = false;
        self
    }

    /// Whether the persisted status this record was restored from
    /// contradicted its dose flags. The record itself carries the derived
    /// status; the next write corrects the stored one.
    pub fn has_stale_status(&self) -> bool {
        self.stale_status
    }

    pub fn completed_count(&self) -> usize {
        self.doses.iter().filter(|d| d.is_completed()).count()
    }

    /// The earliest dose not yet administered.
    pub fn next_due(&self) -> Option<&DoseSlot> {
        self.doses.iter().find(|d| !d.is_completed())
    }

    /// Pending doses whose due date is strictly before `as_of`.
    pub fn overdue_as_of(&self, as_of: NaiveDate) -> Vec<&DoseSlot> {
        self.doses
            .iter()
            .filter(|d| !d.is_completed() && d.due_date() < as_of)
            .collect()
    }

    /// Whether day 3/7/28 sit at their fixed offsets from day 0.
    pub fn has_consistent_due_dates(&self) -> bool {
        let day0 = self.dose(DoseDay::Day0).due_date();
        self.doses.iter().all(|d| {
            day0.checked_add_days(chrono::Days::new(u64::from(d.day().offset_days())))
                == Some(d.due_date())
        })
    }

    pub(crate) fn dose_mut(&mut self, day: DoseDay) -> &mut DoseSlot {
        &mut self.doses[day.index()]
    }

    pub(crate) fn doses_mut(&mut self) -> &mut [DoseSlot; 4] {
        &mut self.doses
    }

    /// Re-derive status from the flags and refresh `updated_at`.
    pub(crate) fn settle(&mut self, now: DateTime<Utc>) {
        self.status = derive_status(&self.doses);
        self.updated_at = now;
    }

    /// Split into the persisted shape.
    pub fn into_parts(self) -> ScheduleParts {
        ScheduleParts::from(self)
    }
}

/// Persisted representation of one dose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseParts {
    pub day: DoseDay,
    pub due_date: NaiveDate,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Persisted representation of a schedule, as stores read and write it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleParts {
    pub id: ScheduleId,
    pub patient_ref: PatientRef,
    pub status: ScheduleStatus,
    pub doses: [DoseParts; 4],
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl From<ScheduleRecord> for ScheduleParts {
    fn from(record: ScheduleRecord) -> Self {
        Self {
            id: record.id,
            patient_ref: record.patient_ref,
            status: record.status,
            doses: record.doses.map(|d| DoseParts {
                day: d.day(),
                due_date: d.due_date(),
                completed: d.is_completed(),
                completed_at: d.completed_at(),
            }),
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
        }
    }
}

impl TryFrom<ScheduleParts> for ScheduleRecord {
    type Error = VaxtrackError;

    fn try_from(parts: ScheduleParts) -> Result<Self, Self::Error> {
        let mut slots = Vec::with_capacity(4);
        for (expected, dose) in DoseDay::ALL.into_iter().zip(parts.doses) {
            if dose.day != expected {
                return Err(VaxtrackError::InvalidRecord(format!(
                    "dose slot for {expected} holds {}",
                    dose.day
                )));
            }
            slots.push(DoseSlot::restore(
                dose.day,
                dose.due_date,
                dose.completed,
                dose.completed_at,
            )?);
        }
        let doses: [DoseSlot; 4] = slots
            .try_into()
            .map_err(|_| VaxtrackError::Internal("dose slot count mismatch".into()))?;

        let status = derive_status(&doses);
        let stale_status = status != parts.status;
        if stale_status {
            warn!(
                schedule_id = %parts.id,
                stored = %parts.status,
                derived = %status,
                "stored schedule status contradicts dose flags, using derived status"
            );
        }

        Ok(Self {
            id: parts.id,
            patient_ref: parts.patient_ref,
            status,
            doses,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            version: parts.version,
            stale_status,
        })
    }
}
