// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion state machine for schedule records.
//!
//! A schedule is `InProgress` until all four doses are complete and returns
//! to `InProgress` as soon as any dose is un-completed. There is no terminal
//! state. Every operation works on a copy of the caller's record, so a
//! rejected operation leaves the input untouched.

use std::sync::Arc;

use tracing::{debug, warn};
use vaxtrack_core::{Clock, VaxtrackError};

use crate::dose::{DoseDay, DoseSlot};
use crate::record::{ScheduleRecord, ScheduleStatus};
use crate::update::{ScheduleField, ScheduleUpdate};

/// `Completed` iff every dose is completed.
pub fn derive_status(doses: &[DoseSlot; 4]) -> ScheduleStatus {
    if doses.iter().all(DoseSlot::is_completed) {
        ScheduleStatus::Completed
    } else {
        ScheduleStatus::InProgress
    }
}

/// Applies dose toggles and partial updates, stamping times from the clock.
pub struct ScheduleStateMachine {
    clock: Arc<dyn Clock>,
}

impl ScheduleStateMachine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Toggle the dose for a raw day number.
    ///
    /// Fails with `InvalidDose` for anything outside {0, 3, 7, 28}.
    pub fn toggle_dose(
        &self,
        record: &ScheduleRecord,
        day: u32,
    ) -> Result<ScheduleRecord, VaxtrackError> {
        let day = DoseDay::try_from(day)?;
        Ok(self.toggle(record, day))
    }

    /// Flip a dose's completion flag.
    pub fn toggle(&self, record: &ScheduleRecord, day: DoseDay) -> ScheduleRecord {
        let now = self.clock.now();
        let mut next = record.clone();
        let slot = next.dose_mut(day);
        let completed = !slot.is_completed();
        slot.set_completed(completed, now);
        next.settle(now);

        debug!(
            schedule_id = %next.id(),
            dose = %day,
            completed,
            status = %next.status(),
            "dose toggled"
        );
        next
    }

    /// Merge an explicit set of field edits into a record.
    ///
    /// After merging, newly completed doses are stamped, un-completed doses
    /// lose their timestamp, and status is re-derived from the flags. A
    /// requested status that disagrees with the derived one is dropped.
    pub fn apply_partial_update(
        &self,
        record: &ScheduleRecord,
        update: &ScheduleUpdate,
    ) -> ScheduleRecord {
        let now = self.clock.now();
        let mut next = record.clone();
        let mut requested_status = None;

        for field in update.fields() {
            match *field {
                ScheduleField::DueDate { day, date } => next.dose_mut(day).set_due_date(date),
                ScheduleField::Completed { day, completed } => {
                    next.dose_mut(day).set_flag(completed)
                }
                ScheduleField::Status { status } => requested_status = Some(status),
            }
        }

        for slot in next.doses_mut().iter_mut() {
            slot.sync_completed_at(now);
        }
        next.settle(now);

        if let Some(requested) = requested_status
            && requested != next.status()
        {
            warn!(
                schedule_id = %next.id(),
                requested = %requested,
                derived = %next.status(),
                "ignoring requested status that contradicts dose completion"
            );
        }

        debug!(
            schedule_id = %next.id(),
            fields = update.fields().len(),
            status = %next.status(),
            "partial update applied"
        );
        next
    }
}
