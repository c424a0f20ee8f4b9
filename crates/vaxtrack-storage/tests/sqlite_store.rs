// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite schedule store integration tests.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use tempfile::TempDir;
use vaxtrack_config::model::{ScheduleConfig, StorageConfig};
use vaxtrack_core::{FixedClock, PatientRef, ScheduleId, VaxtrackError};
use vaxtrack_schedule::{
    DoseDay, ScheduleCalculator, ScheduleRecord, ScheduleService, ScheduleStateMachine,
    ScheduleStatus, ScheduleStore,
};
use vaxtrack_storage::SqliteScheduleStore;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct Fixture {
    _dir: TempDir,
    path: String,
    store: Arc<SqliteScheduleStore>,
    clock: Arc<FixedClock>,
    calc: ScheduleCalculator,
    machine: ScheduleStateMachine,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vaxtrack.db").to_string_lossy().into_owned();
    let store = Arc::new(SqliteScheduleStore::new(StorageConfig {
        database_path: path.clone(),
        wal_mode: true,
    }));
    store.initialize().await.unwrap();
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 9, 15, 30).unwrap(),
    ));
    Fixture {
        _dir: dir,
        path,
        store,
        calc: ScheduleCalculator::new(clock.clone()),
        machine: ScheduleStateMachine::new(clock.clone()),
        clock,
    }
}

impl Fixture {
    fn new_record(&self, patient: &str, start: NaiveDate) -> ScheduleRecord {
        self.calc
            .create_schedule(PatientRef::new(patient), Some(start), None)
            .unwrap()
    }
}

#[tokio::test]
async fn round_trip_preserves_every_field() {
    let fx = fixture().await;
    let record = fx.new_record("p-1", date(2025, 1, 1));
    fx.store.insert(&record).await.unwrap();

    fx.clock.advance(Duration::hours(3));
    let toggled = fx.machine.toggle(&record, DoseDay::Day0);
    let stored = fx.store.update(&toggled).await.unwrap();
    assert_eq!(stored.version(), 1);

    let loaded = fx
        .store
        .find_by_patient(&PatientRef::new("p-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded, stored);
    assert_eq!(
        loaded.dose(DoseDay::Day0).completed_at(),
        Some(Utc.with_ymd_and_hms(2025, 1, 1, 12, 15, 30).unwrap())
    );
    assert_eq!(loaded.dose(DoseDay::Day28).due_date(), date(2025, 1, 29));
    assert_eq!(fx.store.get(record.id()).await.unwrap(), Some(loaded));
    assert_eq!(fx.store.get(&ScheduleId::from("absent")).await.unwrap(), None);
    assert_eq!(
        fx.store.find_by_patient(&PatientRef::new("absent")).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn duplicate_patient_rejected_by_unique_constraint() {
    let fx = fixture().await;
    fx.store
        .insert(&fx.new_record("p-1", date(2025, 1, 1)))
        .await
        .unwrap();
    let err = fx
        .store
        .insert(&fx.new_record("p-1", date(2025, 2, 1)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        VaxtrackError::DuplicateSchedule { ref patient_ref } if patient_ref.as_str() == "p-1"
    ));
    assert_eq!(fx.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn stale_version_conflicts_and_missing_row_is_not_found() {
    let fx = fixture().await;
    let record = fx.new_record("p-1", date(2025, 1, 1));
    fx.store.insert(&record).await.unwrap();

    fx.store
        .update(&fx.machine.toggle(&record, DoseDay::Day0))
        .await
        .unwrap();
    let err = fx
        .store
        .update(&fx.machine.toggle(&record, DoseDay::Day3))
        .await
        .unwrap_err();
    assert!(matches!(err, VaxtrackError::Conflict { .. }));

    let ghost = fx.new_record("ghost", date(2025, 1, 1));
    let err = fx.store.update(&ghost).await.unwrap_err();
    assert!(matches!(err, VaxtrackError::NotFound { .. }));
}

#[tokio::test]
async fn list_orders_newest_first_and_filters() {
    let fx = fixture().await;
    let older = fx.new_record("older", date(2025, 1, 1));
    fx.clock.advance(Duration::minutes(5));
    let newer = fx.new_record("newer", date(2025, 1, 1));
    fx.store.insert(&older).await.unwrap();
    fx.store.insert(&newer).await.unwrap();

    let all = fx.store.list(None).await.unwrap();
    let names: Vec<&str> = all.iter().map(|r| r.patient_ref().as_str()).collect();
    assert_eq!(names, vec!["newer", "older"]);

    let mut done = older.clone();
    for day in DoseDay::ALL {
        done = fx.machine.toggle(&done, day);
    }
    fx.store.update(&done).await.unwrap();

    let completed = fx.store.list(Some(ScheduleStatus::Completed)).await.unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].patient_ref().as_str(), "older");
    let open = fx.store.list(Some(ScheduleStatus::InProgress)).await.unwrap();
    assert_eq!(open.len(), 1);
}

#[tokio::test]
async fn delete_removes_row() {
    let fx = fixture().await;
    let record = fx.new_record("p-1", date(2025, 1, 1));
    fx.store.insert(&record).await.unwrap();
    fx.store.delete(record.id()).await.unwrap();
    assert!(matches!(
        fx.store.delete(record.id()).await,
        Err(VaxtrackError::NotFound { .. })
    ));
    assert_eq!(fx.store.count().await.unwrap(), 0);
}

/// Write a row directly, as an older deployment would have left it.
fn insert_legacy_row(path: &str, patient: &str, day28: &str, completed0_at: Option<&str>) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute(
        "INSERT INTO schedules (id, patient_ref, status,
            day0_date, day0_completed, day0_completed_at,
            day3_date, day7_date, day28_date, created_at, updated_at)
         VALUES (?1, ?2, 'completed', '2025-01-01', 1, ?3,
                 '2025-01-04', '2025-01-08', ?4,
                 '2025-01-01T09:00:00.000000Z', '2025-01-01T09:00:00.000000Z')",
        rusqlite::params![format!("legacy-{patient}"), patient, completed0_at, day28],
    )
    .unwrap();
}

#[tokio::test]
async fn legacy_rows_are_normalized_and_repaired() {
    let fx = fixture().await;
    insert_legacy_row(&fx.path, "drifted", "2025-01-28", Some("2025-01-01T10:00:00Z"));

    let loaded = fx
        .store
        .find_by_patient(&PatientRef::new("drifted"))
        .await
        .unwrap()
        .unwrap();
    // Stored status claimed completed; only Day 0 actually is.
    assert_eq!(loaded.status(), ScheduleStatus::InProgress);
    assert!(!loaded.has_consistent_due_dates());

    let service = ScheduleService::new(
        fx.store.clone(),
        fx.clock.clone(),
        &ScheduleConfig::default(),
    );
    let report = service.repair_all().await.unwrap();
    assert_eq!(report.repaired, 1);

    let fixed = service.get(&PatientRef::new("drifted")).await.unwrap();
    assert_eq!(fixed.dose(DoseDay::Day28).due_date(), date(2025, 1, 29));
    assert!(fixed.dose(DoseDay::Day0).is_completed());
    assert_eq!(fixed.version(), 1);
}

#[tokio::test]
async fn stale_stored_status_is_filtered_by_doses_and_rewritten() {
    let fx = fixture().await;
    insert_legacy_row(&fx.path, "stale", "2025-01-29", Some("2025-01-01T10:00:00Z"));
    let service = ScheduleService::new(
        fx.store.clone(),
        fx.clock.clone(),
        &ScheduleConfig::default(),
    );

    let completed = fx.store.list(Some(ScheduleStatus::Completed)).await.unwrap();
    assert!(completed.is_empty());
    let in_progress = fx.store.list(Some(ScheduleStatus::InProgress)).await.unwrap();
    assert_eq!(in_progress.len(), 1);
    assert!(in_progress[0].has_consistent_due_dates());
    assert!(in_progress[0].has_stale_status());

    let overdue = service.overdue(Some(date(2025, 2, 1))).await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(
        overdue[0].overdue,
        vec![DoseDay::Day3, DoseDay::Day7, DoseDay::Day28]
    );

    let report = service.repair_all().await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.repaired, 1);

    let conn = rusqlite::Connection::open(&fx.path).unwrap();
    let stored: String = conn
        .query_row(
            "SELECT status FROM schedules WHERE patient_ref = 'stale'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, "in_progress");

    let fixed = service.get(&PatientRef::new("stale")).await.unwrap();
    assert!(!fixed.has_stale_status());
    assert_eq!(fixed.version(), 1);
    assert_eq!(service.repair_all().await.unwrap().repaired, 0);
}

#[tokio::test]
async fn completed_row_without_timestamp_is_invalid() {
    let fx = fixture().await;
    insert_legacy_row(&fx.path, "broken", "2025-01-29", None);
    let err = fx
        .store
        .find_by_patient(&PatientRef::new("broken"))
        .await
        .unwrap_err();
    assert!(matches!(err, VaxtrackError::InvalidRecord(_)));
}
