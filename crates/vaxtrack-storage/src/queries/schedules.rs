// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CRUD on the `schedules` table.

use rusqlite::{OptionalExtension, params};
use vaxtrack_core::{PatientRef, ScheduleId, VaxtrackError};
use vaxtrack_schedule::{ScheduleRecord, ScheduleStatus};

use crate::database::{Database, map_tr_err};
use crate::models::{SCHEDULE_COLUMNS, ScheduleRow};

/// What a compare-and-swap update found.
enum UpdateOutcome {
    Written,
    Stale,
    Missing,
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    use rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE;
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Insert a new schedule at version 0.
///
/// A second schedule for the same patient hits the `patient_ref` UNIQUE
/// constraint and comes back as `DuplicateSchedule`.
pub async fn insert_schedule(db: &Database, record: &ScheduleRecord) -> Result<(), VaxtrackError> {
    let row = ScheduleRow::try_from(&record.clone().with_version(0))?;
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let [d0, d3, d7, d28] = &row.doses;
            let result = conn.execute(
                "INSERT INTO schedules (id, patient_ref, status,
                    day0_date, day0_completed, day0_completed_at,
                    day3_date, day3_completed, day3_completed_at,
                    day7_date, day7_completed, day7_completed_at,
                    day28_date, day28_completed, day28_completed_at,
                    created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                         ?13, ?14, ?15, ?16, ?17, ?18)",
                params![
                    row.id,
                    row.patient_ref,
                    row.status,
                    d0.date,
                    d0.completed,
                    d0.completed_at,
                    d3.date,
                    d3.completed,
                    d3.completed_at,
                    d7.date,
                    d7.completed,
                    d7.completed_at,
                    d28.date,
                    d28.completed,
                    d28.completed_at,
                    row.created_at,
                    row.updated_at,
                    row.version,
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;

    if inserted {
        Ok(())
    } else {
        Err(VaxtrackError::DuplicateSchedule {
            patient_ref: record.patient_ref().clone(),
        })
    }
}

/// Fetch the schedule owned by a patient.
pub async fn get_by_patient(
    db: &Database,
    patient_ref: &PatientRef,
) -> Result<Option<ScheduleRecord>, VaxtrackError> {
    let key = patient_ref.as_str().to_string();
    let row = db
        .connection()
        .call(move |conn| -> Result<Option<ScheduleRow>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE patient_ref = ?1"),
                params![key],
                ScheduleRow::from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    row.map(ScheduleRow::into_record).transpose()
}

/// Fetch a schedule by id.
pub async fn get_by_id(
    db: &Database,
    id: &ScheduleId,
) -> Result<Option<ScheduleRecord>, VaxtrackError> {
    let key = id.as_str().to_string();
    let row = db
        .connection()
        .call(move |conn| -> Result<Option<ScheduleRow>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = ?1"),
                params![key],
                ScheduleRow::from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    row.map(ScheduleRow::into_record).transpose()
}

/// Overwrite a schedule if its stored version still matches.
///
/// Returns the record at its new version.
pub async fn update_schedule(
    db: &Database,
    record: &ScheduleRecord,
) -> Result<ScheduleRecord, VaxtrackError> {
    let row = ScheduleRow::try_from(record)?;
    let outcome = db
        .connection()
        .call(move |conn| -> Result<UpdateOutcome, rusqlite::Error> {
            let [d0, d3, d7, d28] = &row.doses;
            let changed = conn.execute(
                "UPDATE schedules SET status = ?3,
                    day0_date = ?4, day0_completed = ?5, day0_completed_at = ?6,
                    day3_date = ?7, day3_completed = ?8, day3_completed_at = ?9,
                    day7_date = ?10, day7_completed = ?11, day7_completed_at = ?12,
                    day28_date = ?13, day28_completed = ?14, day28_completed_at = ?15,
                    updated_at = ?16, version = version + 1
                 WHERE id = ?1 AND version = ?2",
                params![
                    row.id,
                    row.version,
                    row.status,
                    d0.date,
                    d0.completed,
                    d0.completed_at,
                    d3.date,
                    d3.completed,
                    d3.completed_at,
                    d7.date,
                    d7.completed,
                    d7.completed_at,
                    d28.date,
                    d28.completed,
                    d28.completed_at,
                    row.updated_at,
                ],
            )?;
            if changed == 1 {
                return Ok(UpdateOutcome::Written);
            }
            let exists = conn
                .query_row(
                    "SELECT 1 FROM schedules WHERE id = ?1",
                    params![row.id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(match exists {
                Some(()) => UpdateOutcome::Stale,
                None => UpdateOutcome::Missing,
            })
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        UpdateOutcome::Written => Ok(record.clone().with_version(record.version() + 1)),
        UpdateOutcome::Stale => Err(VaxtrackError::Conflict {
            schedule_id: record.id().clone(),
        }),
        UpdateOutcome::Missing => Err(VaxtrackError::NotFound {
            entity: "schedule",
            key: record.id().to_string(),
        }),
    }
}

/// List schedules newest first, optionally filtered by status.
///
/// The filter applies to the status derived from the dose flags, not the
/// stored column, which a legacy row may hold out of step.
pub async fn list_schedules(
    db: &Database,
    status: Option<ScheduleStatus>,
) -> Result<Vec<ScheduleRecord>, VaxtrackError> {
    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<ScheduleRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SCHEDULE_COLUMNS} FROM schedules ORDER BY created_at DESC, id"
            ))?;
            let rows = stmt
                .query_map([], ScheduleRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let record = row.into_record()?;
        if status.is_none_or(|s| record.status() == s) {
            records.push(record);
        }
    }
    Ok(records)
}

/// Delete a schedule. Returns whether a row was removed.
pub async fn delete_schedule(db: &Database, id: &ScheduleId) -> Result<bool, VaxtrackError> {
    let key = id.as_str().to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            Ok(conn.execute("DELETE FROM schedules WHERE id = ?1", params![key])? > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of stored schedules.
pub async fn count_schedules(db: &Database) -> Result<u64, VaxtrackError> {
    let count = db
        .connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM schedules", [], |r| r.get(0))
        })
        .await
        .map_err(map_tr_err)?;
    Ok(u64::try_from(count).unwrap_or_default())
}
