// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence collaborator for schedule records.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use vaxtrack_core::{HealthStatus, PatientRef, ScheduleId, VaxtrackError};

use crate::record::{ScheduleRecord, ScheduleStatus};

/// Storage backend for schedule records.
///
/// Implementations own uniqueness (one schedule per patient) and serialize
/// concurrent writers through the record's `version`.
#[async_trait]
pub trait ScheduleStore: Send + Sync + 'static {
    /// Returns the human-readable name of this store.
    fn name(&self) -> &str;

    /// Performs a health check and returns the store's current status.
    async fn health_check(&self) -> Result<HealthStatus, VaxtrackError>;

    /// Look up the schedule owned by a patient.
    async fn find_by_patient(
        &self,
        patient_ref: &PatientRef,
    ) -> Result<Option<ScheduleRecord>, VaxtrackError>;

    /// Look up a schedule by its identifier.
    async fn get(&self, id: &ScheduleId) -> Result<Option<ScheduleRecord>, VaxtrackError>;

    /// Insert a new record. A second record for the same patient is
    /// rejected with `DuplicateSchedule`.
    async fn insert(&self, record: &ScheduleRecord) -> Result<(), VaxtrackError>;

    /// Replace a record if its stored version still equals `record.version()`.
    ///
    /// Returns the record as stored, with the incremented version. A version
    /// mismatch is `Conflict`; a missing row is `NotFound`.
    async fn update(&self, record: &ScheduleRecord) -> Result<ScheduleRecord, VaxtrackError>;

    /// List records, optionally filtered by status.
    async fn list(
        &self,
        status: Option<ScheduleStatus>,
    ) -> Result<Vec<ScheduleRecord>, VaxtrackError>;

    /// Administrative removal. `NotFound` when absent.
    async fn delete(&self, id: &ScheduleId) -> Result<(), VaxtrackError>;
}

/// In-process store keyed by schedule id.
#[derive(Debug, Default)]
pub struct MemoryScheduleStore {
    records: RwLock<HashMap<ScheduleId, ScheduleRecord>>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> Result<HealthStatus, VaxtrackError> {
        Ok(HealthStatus::Healthy)
    }

    async fn find_by_patient(
        &self,
        patient_ref: &PatientRef,
    ) -> Result<Option<ScheduleRecord>, VaxtrackError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.patient_ref() == patient_ref)
            .cloned())
    }

    async fn get(&self, id: &ScheduleId) -> Result<Option<ScheduleRecord>, VaxtrackError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn insert(&self, record: &ScheduleRecord) -> Result<(), VaxtrackError> {
        let mut records = self.records.write().await;
        if records
            .values()
            .any(|r| r.patient_ref() == record.patient_ref())
        {
            return Err(VaxtrackError::DuplicateSchedule {
                patient_ref: record.patient_ref().clone(),
            });
        }
        if records.contains_key(record.id()) {
            return Err(VaxtrackError::Internal(format!(
                "schedule id {} already in use",
                record.id()
            )));
        }
        records.insert(record.id().clone(), record.clone().with_version(0));
        Ok(())
    }

    async fn update(&self, record: &ScheduleRecord) -> Result<ScheduleRecord, VaxtrackError> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(record.id())
            .ok_or_else(|| VaxtrackError::NotFound {
                entity: "schedule",
                key: record.id().to_string(),
            })?;
        if stored.version() != record.version() {
            return Err(VaxtrackError::Conflict {
                schedule_id: record.id().clone(),
            });
        }
        *stored = record.clone().with_version(record.version() + 1);
        Ok(stored.clone())
    }

    async fn list(
        &self,
        status: Option<ScheduleStatus>,
    ) -> Result<Vec<ScheduleRecord>, VaxtrackError> {
        let records = self.records.read().await;
        let mut out: Vec<ScheduleRecord> = records
            .values()
            .filter(|r| status.is_none_or(|s| r.status() == s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(out)
    }

    async fn delete(&self, id: &ScheduleId) -> Result<(), VaxtrackError> {
        self.records
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| VaxtrackError::NotFound {
                entity: "schedule",
                key: id.to_string(),
            })
    }
}
