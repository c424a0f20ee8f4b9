// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`ScheduleStore`].

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;
use vaxtrack_config::model::StorageConfig;
use vaxtrack_core::{HealthStatus, PatientRef, ScheduleId, VaxtrackError};
use vaxtrack_schedule::{ScheduleRecord, ScheduleStatus, ScheduleStore};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed schedule store.
///
/// The database is opened by [`SqliteScheduleStore::initialize`]; every other
/// call fails with a storage error until then.
pub struct SqliteScheduleStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteScheduleStore {
    /// Create a store for the configured path without opening it.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and run migrations. Fails if called twice.
    pub async fn initialize(&self) -> Result<(), VaxtrackError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| VaxtrackError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite schedule store initialized");
        Ok(())
    }

    /// Checkpoint the WAL. A no-op when never initialized.
    pub async fn close(&self) -> Result<(), VaxtrackError> {
        match self.db.get() {
            Some(db) => db.close().await,
            None => Ok(()),
        }
    }

    /// Number of stored schedules.
    pub async fn count(&self) -> Result<u64, VaxtrackError> {
        queries::schedules::count_schedules(self.db()?).await
    }

    pub fn database_path(&self) -> &str {
        &self.config.database_path
    }

    fn db(&self) -> Result<&Database, VaxtrackError> {
        self.db.get().ok_or_else(|| VaxtrackError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl ScheduleStore for SqliteScheduleStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn health_check(&self) -> Result<HealthStatus, VaxtrackError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("database not opened".into()));
        };
        let integrity = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA quick_check", [], |r| r.get(0))
            })
            .await
            .map_err(map_tr_err)?;
        if integrity == "ok" {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(integrity))
        }
    }

    async fn find_by_patient(
        &self,
        patient_ref: &PatientRef,
    ) -> Result<Option<ScheduleRecord>, VaxtrackError> {
        queries::schedules::get_by_patient(self.db()?, patient_ref).await
    }

    async fn get(&self, id: &ScheduleId) -> Result<Option<ScheduleRecord>, VaxtrackError> {
        queries::schedules::get_by_id(self.db()?, id).await
    }

    async fn insert(&self, record: &ScheduleRecord) -> Result<(), VaxtrackError> {
        queries::schedules::insert_schedule(self.db()?, record).await
    }

    async fn update(&self, record: &ScheduleRecord) -> Result<ScheduleRecord, VaxtrackError> {
        queries::schedules::update_schedule(self.db()?, record).await
    }

    async fn list(
        &self,
        status: Option<ScheduleStatus>,
    ) -> Result<Vec<ScheduleRecord>, VaxtrackError> {
        queries::schedules::list_schedules(self.db()?, status).await
    }

    async fn delete(&self, id: &ScheduleId) -> Result<(), VaxtrackError> {
        if queries::schedules::delete_schedule(self.db()?, id).await? {
            Ok(())
        } else {
            Err(VaxtrackError::NotFound {
                entity: "schedule",
                key: id.to_string(),
            })
        }
    }
}
