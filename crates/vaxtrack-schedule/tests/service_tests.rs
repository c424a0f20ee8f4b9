// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service-level tests against the in-memory store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use tracing_test::traced_test;
use vaxtrack_config::model::ScheduleConfig;
use vaxtrack_core::{FixedClock, HealthStatus, PatientRef, ScheduleId, VaxtrackError};
use vaxtrack_schedule::{
    DoseDay, MemoryScheduleStore, ScheduleParts, ScheduleRecord, ScheduleService,
    ScheduleStateMachine, ScheduleStatus, ScheduleStore, ScheduleUpdate,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
    ))
}

fn service_with(
    store: Arc<dyn ScheduleStore>,
    clock: Arc<FixedClock>,
    retries: u32,
) -> ScheduleService {
    let config = ScheduleConfig {
        max_update_retries: retries,
    };
    ScheduleService::new(store, clock, &config)
}

fn service() -> (ScheduleService, Arc<FixedClock>) {
    let clock = clock();
    (
        service_with(Arc::new(MemoryScheduleStore::new()), clock.clone(), 3),
        clock,
    )
}

/// Store that fails the first `conflicts` updates as if another writer won.
struct ConflictingStore {
    inner: MemoryScheduleStore,
    conflicts: AtomicU32,
    updates: AtomicU32,
}

impl ConflictingStore {
    fn new(conflicts: u32) -> Self {
        Self {
            inner: MemoryScheduleStore::new(),
            conflicts: AtomicU32::new(conflicts),
            updates: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ScheduleStore for ConflictingStore {
    fn name(&self) -> &str {
        "conflicting"
    }

    async fn health_check(&self) -> Result<HealthStatus, VaxtrackError> {
        self.inner.health_check().await
    }

    async fn find_by_patient(
        &self,
        patient_ref: &PatientRef,
    ) -> Result<Option<ScheduleRecord>, VaxtrackError> {
        self.inner.find_by_patient(patient_ref).await
    }

    async fn get(&self, id: &ScheduleId) -> Result<Option<ScheduleRecord>, VaxtrackError> {
        self.inner.get(id).await
    }

    async fn insert(&self, record: &ScheduleRecord) -> Result<(), VaxtrackError> {
        self.inner.insert(record).await
    }

    async fn update(&self, record: &ScheduleRecord) -> Result<ScheduleRecord, VaxtrackError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            return Err(VaxtrackError::Conflict {
                schedule_id: record.id().clone(),
            });
        }
        self.inner.update(record).await
    }

    async fn list(
        &self,
        status: Option<ScheduleStatus>,
    ) -> Result<Vec<ScheduleRecord>, VaxtrackError> {
        self.inner.list(status).await
    }

    async fn delete(&self, id: &ScheduleId) -> Result<(), VaxtrackError> {
        self.inner.delete(id).await
    }
}

/// Store where another clinician completes Day 3 just before our first write.
struct RacingStore {
    inner: MemoryScheduleStore,
    machine: ScheduleStateMachine,
    raced: AtomicU32,
}

#[async_trait]
impl ScheduleStore for RacingStore {
    fn name(&self) -> &str {
        "racing"
    }

    async fn health_check(&self) -> Result<HealthStatus, VaxtrackError> {
        Ok(HealthStatus::Healthy)
    }

    async fn find_by_patient(
        &self,
        patient_ref: &PatientRef,
    ) -> Result<Option<ScheduleRecord>, VaxtrackError> {
        self.inner.find_by_patient(patient_ref).await
    }

    async fn get(&self, id: &ScheduleId) -> Result<Option<ScheduleRecord>, VaxtrackError> {
        self.inner.get(id).await
    }

    async fn insert(&self, record: &ScheduleRecord) -> Result<(), VaxtrackError> {
        self.inner.insert(record).await
    }

    async fn update(&self, record: &ScheduleRecord) -> Result<ScheduleRecord, VaxtrackError> {
        if self.raced.fetch_add(1, Ordering::SeqCst) == 0
            && let Some(current) = self.inner.get(record.id()).await?
        {
            let other = self.machine.toggle(&current, DoseDay::Day3);
            self.inner.update(&other).await?;
        }
        self.inner.update(record).await
    }

    async fn list(
        &self,
        status: Option<ScheduleStatus>,
    ) -> Result<Vec<ScheduleRecord>, VaxtrackError> {
        self.inner.list(status).await
    }

    async fn delete(&self, id: &ScheduleId) -> Result<(), VaxtrackError> {
        self.inner.delete(id).await
    }
}

// ---- creation ----

#[tokio::test]
async fn create_persists_fixed_offsets() {
    let (svc, _) = service();
    let record = svc
        .create(PatientRef::new("p-1"), Some(date(2025, 1, 1)))
        .await
        .unwrap();

    let due = record.due_dates();
    assert_eq!(due.day0, date(2025, 1, 1));
    assert_eq!(due.day3, date(2025, 1, 4));
    assert_eq!(due.day7, date(2025, 1, 8));
    assert_eq!(due.day28, date(2025, 1, 29));
    assert_eq!(svc.get(&PatientRef::new("p-1")).await.unwrap(), record);
}

#[tokio::test]
async fn create_defaults_to_clinic_today() {
    let clock = Arc::new(
        FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 8, 20, 0, 0).unwrap())
            .with_offset(chrono::FixedOffset::east_opt(8 * 3600).unwrap()),
    );
    let svc = service_with(Arc::new(MemoryScheduleStore::new()), clock, 3);
    let record = svc.create(PatientRef::new("p-1"), None).await.unwrap();
    // 20:00 UTC is already the 9th at +08:00.
    assert_eq!(record.dose(DoseDay::Day0).due_date(), date(2025, 3, 9));
}

#[tokio::test]
async fn duplicate_create_is_refused() {
    let (svc, _) = service();
    let first = svc.create(PatientRef::new("p-1"), None).await.unwrap();
    let err = svc.create(PatientRef::new("p-1"), None).await.unwrap_err();
    assert!(matches!(err, VaxtrackError::DuplicateSchedule { .. }));
    assert!(err.is_client_error());

    let all = svc.list(None).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id(), first.id());
}

// ---- toggling ----

#[tokio::test]
async fn toggle_all_four_completes_schedule() {
    let (svc, clock) = service();
    let patient = PatientRef::new("p-1");
    svc.create(patient.clone(), Some(date(2025, 1, 1))).await.unwrap();

    for day in [0, 3, 7] {
        clock.advance(Duration::days(1));
        let record = svc.toggle(&patient, day).await.unwrap();
        assert_eq!(record.status(), ScheduleStatus::InProgress);
    }
    let record = svc.toggle(&patient, 28).await.unwrap();
    assert_eq!(record.status(), ScheduleStatus::Completed);
    assert_eq!(record.completed_count(), 4);
    assert_eq!(record.version(), 4);

    let record = svc.toggle(&patient, 3).await.unwrap();
    assert_eq!(record.status(), ScheduleStatus::InProgress);
    assert!(record.dose(DoseDay::Day3).completed_at().is_none());
}

#[tokio::test]
async fn invalid_day_rejected_before_lookup() {
    let (svc, _) = service();
    // No schedule exists: the dose error must win over NotFound.
    let err = svc.toggle(&PatientRef::new("nobody"), 14).await.unwrap_err();
    assert!(matches!(err, VaxtrackError::InvalidDose { day: 14 }));
}

#[tokio::test]
async fn toggle_unknown_patient_is_not_found() {
    let (svc, _) = service();
    let err = svc.toggle(&PatientRef::new("nobody"), 0).await.unwrap_err();
    assert!(matches!(err, VaxtrackError::NotFound { .. }));
}

// ---- partial updates ----

#[tokio::test]
#[traced_test]
async fn update_cannot_force_completed_status() {
    let (svc, _) = service();
    let patient = PatientRef::new("p-1");
    svc.create(patient.clone(), Some(date(2025, 1, 1))).await.unwrap();

    let update = ScheduleUpdate::new()
        .completed(DoseDay::Day0, true)
        .status(ScheduleStatus::Completed);
    let record = svc.update(&patient, &update).await.unwrap();

    assert_eq!(record.status(), ScheduleStatus::InProgress);
    assert!(record.dose(DoseDay::Day0).completed_at().is_some());
    assert!(logs_contain("contradicts dose completion"));
}

#[tokio::test]
async fn no_op_update_skips_write() {
    let (svc, _) = service();
    let patient = PatientRef::new("p-1");
    let created = svc.create(patient.clone(), Some(date(2025, 1, 1))).await.unwrap();

    let update = ScheduleUpdate::new().completed(DoseDay::Day7, false);
    let record = svc.update(&patient, &update).await.unwrap();
    assert_eq!(record.version(), created.version());
    assert_eq!(record.updated_at(), created.updated_at());
}

// ---- concurrency ----

#[tokio::test]
async fn lost_race_is_retried_on_fresh_copy() {
    let clock = clock();
    let store = Arc::new(RacingStore {
        inner: MemoryScheduleStore::new(),
        machine: ScheduleStateMachine::new(clock.clone()),
        raced: AtomicU32::new(0),
    });
    let svc = service_with(store, clock, 3);
    let patient = PatientRef::new("p-1");
    svc.create(patient.clone(), Some(date(2025, 1, 1))).await.unwrap();

    let record = svc.toggle(&patient, 0).await.unwrap();
    // Both the racing write and ours survive.
    assert!(record.dose(DoseDay::Day0).is_completed());
    assert!(record.dose(DoseDay::Day3).is_completed());
    assert_eq!(record.version(), 2);
}

#[tokio::test]
async fn conflicts_beyond_retry_budget_surface() {
    let store = Arc::new(ConflictingStore::new(10));
    let svc = service_with(store.clone(), clock(), 2);
    let patient = PatientRef::new("p-1");
    svc.create(patient.clone(), None).await.unwrap();

    let err = svc.toggle(&patient, 0).await.unwrap_err();
    assert!(matches!(err, VaxtrackError::Conflict { .. }));
    // One initial attempt plus two retries.
    assert_eq!(store.updates.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn conflicts_within_retry_budget_succeed() {
    let store = Arc::new(ConflictingStore::new(2));
    let svc = service_with(store, clock(), 2);
    let patient = PatientRef::new("p-1");
    svc.create(patient.clone(), None).await.unwrap();
    let record = svc.toggle(&patient, 0).await.unwrap();
    assert!(record.dose(DoseDay::Day0).is_completed());
}

#[tokio::test]
async fn concurrent_toggles_of_different_doses_both_land() {
    let (svc, _) = service();
    let svc = Arc::new(svc);
    let patient = PatientRef::new("p-1");
    svc.create(patient.clone(), Some(date(2025, 1, 1))).await.unwrap();

    let handles: Vec<_> = [0u32, 3, 7, 28]
        .into_iter()
        .map(|day| {
            let svc = svc.clone();
            let patient = patient.clone();
            tokio::spawn(async move { svc.toggle(&patient, day).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let record = svc.get(&patient).await.unwrap();
    assert_eq!(record.status(), ScheduleStatus::Completed);
}

// ---- queries and maintenance ----

#[tokio::test]
async fn overdue_reports_pending_past_due_doses() {
    let (svc, _) = service();
    svc.create(PatientRef::new("late"), Some(date(2025, 1, 1))).await.unwrap();
    svc.create(PatientRef::new("fresh"), Some(date(2025, 1, 10))).await.unwrap();
    svc.toggle(&PatientRef::new("late"), 0).await.unwrap();

    let overdue = svc.overdue(Some(date(2025, 1, 10))).await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].record.patient_ref().as_str(), "late");
    assert_eq!(overdue[0].overdue, vec![DoseDay::Day3, DoseDay::Day7]);
}

#[tokio::test]
async fn remove_deletes_schedule() {
    let (svc, _) = service();
    let patient = PatientRef::new("p-1");
    svc.create(patient.clone(), None).await.unwrap();
    svc.remove(&patient).await.unwrap();
    assert!(matches!(
        svc.get(&patient).await,
        Err(VaxtrackError::NotFound { .. })
    ));
    // A new schedule may be opened after removal.
    svc.create(patient, None).await.unwrap();
}

#[tokio::test]
async fn repair_fixes_only_drifted_records() {
    let (svc, _) = service();
    let good = svc
        .create(PatientRef::new("good"), Some(date(2025, 1, 1)))
        .await
        .unwrap();
    let bad = svc
        .create(PatientRef::new("bad"), Some(date(2025, 1, 1)))
        .await
        .unwrap();

    // Simulate a legacy row whose Day 28 was computed with elapsed time.
    let mut parts: ScheduleParts = bad.into_parts();
    parts.doses[3].due_date = date(2025, 1, 28);
    let drifted = ScheduleRecord::try_from(parts).unwrap();
    svc.store().update(&drifted).await.unwrap();

    let report = svc.repair_all().await.unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.repaired, 1);

    let fixed = svc.get(&PatientRef::new("bad")).await.unwrap();
    assert_eq!(fixed.dose(DoseDay::Day28).due_date(), date(2025, 1, 29));
    let untouched = svc.get(&PatientRef::new("good")).await.unwrap();
    assert_eq!(untouched.version(), good.version());

    // A second pass finds nothing to do.
    assert_eq!(svc.repair_all().await.unwrap().repaired, 0);
}
