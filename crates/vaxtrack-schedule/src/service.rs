// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store-backed schedule operations.
//!
//! [`ScheduleService`] joins the pure calculator and state machine to a
//! [`ScheduleStore`]. Every mutation is a read-modify-write guarded by the
//! record version; a lost race is retried against the fresh row up to
//! `schedule.max_update_retries` times before `Conflict` reaches the caller.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use vaxtrack_config::model::ScheduleConfig;
use vaxtrack_core::{Clock, PatientRef, VaxtrackError};

use crate::calculator::ScheduleCalculator;
use crate::dose::{DoseDay, DoseSlot};
use crate::record::{ScheduleRecord, ScheduleStatus};
use crate::state::ScheduleStateMachine;
use crate::store::ScheduleStore;
use crate::update::ScheduleUpdate;

/// Outcome of a bulk due-date repair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Records examined.
    pub scanned: usize,
    /// Records whose due dates were rewritten.
    pub repaired: usize,
}

/// A schedule with pending doses past their due date.
#[derive(Debug, Clone)]
pub struct OverdueSchedule {
    pub record: ScheduleRecord,
    pub overdue: Vec<DoseDay>,
}

/// Schedule operations over a persistent store.
pub struct ScheduleService {
    store: Arc<dyn ScheduleStore>,
    clock: Arc<dyn Clock>,
    calculator: ScheduleCalculator,
    machine: ScheduleStateMachine,
    max_update_retries: u32,
}

impl ScheduleService {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        clock: Arc<dyn Clock>,
        config: &ScheduleConfig,
    ) -> Self {
        Self {
            store,
            calculator: ScheduleCalculator::new(clock.clone()),
            machine: ScheduleStateMachine::new(clock.clone()),
            clock,
            max_update_retries: config.max_update_retries,
        }
    }

    pub fn store(&self) -> &Arc<dyn ScheduleStore> {
        &self.store
    }

    /// Create and persist a schedule for a patient.
    ///
    /// Refused with `DuplicateSchedule` when the patient already has one,
    /// whether found up front or raced in by another writer.
    pub async fn create(
        &self,
        patient_ref: PatientRef,
        start_date: Option<NaiveDate>,
    ) -> Result<ScheduleRecord, VaxtrackError> {
        let existing = self.store.find_by_patient(&patient_ref).await?;
        let record = self.calculator.create_schedule(
            patient_ref,
            start_date,
            existing.as_ref().map(ScheduleRecord::id),
        )?;
        self.store.insert(&record).await?;

        info!(
            schedule_id = %record.id(),
            patient_ref = %record.patient_ref(),
            status = %record.status(),
            day0 = %record.dose(DoseDay::Day0).due_date(),
            "schedule created"
        );
        Ok(record)
    }

    /// The patient's schedule, or `NotFound`.
    pub async fn get(&self, patient_ref: &PatientRef) -> Result<ScheduleRecord, VaxtrackError> {
        self.store
            .find_by_patient(patient_ref)
            .await?
            .ok_or_else(|| VaxtrackError::schedule_not_found(patient_ref))
    }

    /// Flip one dose's completion for a patient.
    ///
    /// The day number is checked before the store is touched.
    pub async fn toggle(
        &self,
        patient_ref: &PatientRef,
        day: u32,
    ) -> Result<ScheduleRecord, VaxtrackError> {
        let day = DoseDay::try_from(day)?;
        let record = self
            .mutate(patient_ref, |current| Ok(self.machine.toggle(current, day)))
            .await?;

        info!(
            schedule_id = %record.id(),
            %patient_ref,
            dose = %day,
            completed = record.dose(day).is_completed(),
            status = %record.status(),
            "dose toggled"
        );
        Ok(record)
    }

    /// Apply a partial update for a patient.
    pub async fn update(
        &self,
        patient_ref: &PatientRef,
        update: &ScheduleUpdate,
    ) -> Result<ScheduleRecord, VaxtrackError> {
        let record = self
            .mutate(patient_ref, |current| {
                Ok(self.machine.apply_partial_update(current, update))
            })
            .await?;

        info!(
            schedule_id = %record.id(),
            %patient_ref,
            fields = update.fields().len(),
            status = %record.status(),
            "schedule updated"
        );
        Ok(record)
    }

    /// Re-derive day 3/7/28 from day 0 for one patient.
    pub async fn recompute(
        &self,
        patient_ref: &PatientRef,
    ) -> Result<ScheduleRecord, VaxtrackError> {
        let record = self
            .mutate(patient_ref, |current| {
                self.calculator.recompute_due_dates(current)
            })
            .await?;

        info!(
            schedule_id = %record.id(),
            %patient_ref,
            status = %record.status(),
            "due dates recomputed"
        );
        Ok(record)
    }

    /// All schedules, newest first, optionally filtered by status.
    pub async fn list(
        &self,
        status: Option<ScheduleStatus>,
    ) -> Result<Vec<ScheduleRecord>, VaxtrackError> {
        self.store.list(status).await
    }

    /// In-progress schedules with doses due strictly before `as_of`
    /// (the clinic's today when `None`).
    pub async fn overdue(
        &self,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<OverdueSchedule>, VaxtrackError> {
        let as_of = as_of.unwrap_or_else(|| self.clock.today());
        let records = self.store.list(Some(ScheduleStatus::InProgress)).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| {
                let overdue: Vec<DoseDay> = record
                    .overdue_as_of(as_of)
                    .into_iter()
                    .map(DoseSlot::day)
                    .collect();
                (!overdue.is_empty()).then_some(OverdueSchedule { record, overdue })
            })
            .collect())
    }

    /// Administratively remove a patient's schedule.
    pub async fn remove(&self, patient_ref: &PatientRef) -> Result<(), VaxtrackError> {
        let record = self.get(patient_ref).await?;
        self.store.delete(record.id()).await?;
        info!(schedule_id = %record.id(), %patient_ref, "schedule removed");
        Ok(())
    }

    /// Recompute due dates on every stored schedule whose offsets drifted,
    /// and rewrite any whose stored status contradicts its dose flags.
    pub async fn repair_all(&self) -> Result<RepairReport, VaxtrackError> {
        let records = self.store.list(None).await?;
        let mut report = RepairReport {
            scanned: records.len(),
            repaired: 0,
        };

        for record in records {
            if record.has_consistent_due_dates() && !record.has_stale_status() {
                continue;
            }
            let before = record.due_dates();
            let repaired = self.recompute(record.patient_ref()).await?;
            if repaired.due_dates() != before || record.has_stale_status() {
                report.repaired += 1;
            }
        }

        info!(
            scanned = report.scanned,
            repaired = report.repaired,
            "due-date repair finished"
        );
        Ok(report)
    }

    /// Read the patient's record, apply `change`, and write it back under
    /// the version it was read at. Retries on `Conflict`.
    async fn mutate<F>(
        &self,
        patient_ref: &PatientRef,
        change: F,
    ) -> Result<ScheduleRecord, VaxtrackError>
    where
        F: Fn(&ScheduleRecord) -> Result<ScheduleRecord, VaxtrackError>,
    {
        let mut attempt = 0;
        loop {
            let current = self.get(patient_ref).await?;
            let next = change(&current)?;

            let unchanged =
                next.doses() == current.doses() && next.status() == current.status();
            if unchanged && !current.has_stale_status() {
                debug!(schedule_id = %current.id(), "no change, skipping write");
                return Ok(current);
            }

            match self.store.update(&next).await {
                Ok(stored) => return Ok(stored),
                Err(VaxtrackError::Conflict { schedule_id })
                    if attempt < self.max_update_retries =>
                {
                    attempt += 1;
                    warn!(
                        %schedule_id,
                        attempt,
                        "concurrent schedule write, retrying on fresh copy"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}
