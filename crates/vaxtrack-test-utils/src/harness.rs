// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temp-database harness for end-to-end schedule tests.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use vaxtrack_config::model::{ScheduleConfig, StorageConfig, VaxtrackConfig};
use vaxtrack_core::{FixedClock, VaxtrackError};
use vaxtrack_schedule::ScheduleService;
use vaxtrack_storage::SqliteScheduleStore;

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    now: DateTime<Utc>,
    offset: FixedOffset,
    max_update_retries: u32,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            now: Utc
                .with_ymd_and_hms(2025, 1, 1, 9, 0, 0)
                .single()
                .unwrap_or_default(),
            offset: Utc.fix(),
            max_update_retries: ScheduleConfig::default().max_update_retries,
        }
    }

    /// Start the clock at `now` instead of 2025-01-01 09:00 UTC.
    pub fn starting_at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Use a clinic UTC offset other than UTC.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_max_update_retries(mut self, retries: u32) -> Self {
        self.max_update_retries = retries;
        self
    }

    /// Create the temp database and assemble the service.
    pub async fn build(self) -> Result<TestHarness, VaxtrackError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| VaxtrackError::Storage {
            source: Box::new(e),
        })?;
        let db_path = temp_dir.path().join("test.db").to_string_lossy().into_owned();

        let mut config = VaxtrackConfig::default();
        config.storage = StorageConfig {
            database_path: db_path,
            wal_mode: true,
        };
        config.clinic.utc_offset = self.offset.to_string();
        config.schedule.max_update_retries = self.max_update_retries;

        let store = Arc::new(SqliteScheduleStore::new(config.storage.clone()));
        store.initialize().await?;

        let clock = Arc::new(FixedClock::new(self.now).with_offset(self.offset));
        let service = ScheduleService::new(store.clone(), clock.clone(), &config.schedule);

        Ok(TestHarness {
            service,
            store,
            clock,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A schedule service over a throwaway SQLite database.
pub struct TestHarness {
    pub service: ScheduleService,
    /// The SQLite store behind `service`.
    pub store: Arc<SqliteScheduleStore>,
    /// Settable clock shared by the calculator and state machine.
    pub clock: Arc<FixedClock>,
    /// Configuration the harness was built with.
    pub config: VaxtrackConfig,
    /// Kept alive so the database survives until drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn database_path(&self) -> &str {
        &self.config.storage.database_path
    }

    /// Run raw SQL against the database, e.g. to plant legacy rows.
    pub fn execute_sql(&self, sql: &str) -> Result<usize, VaxtrackError> {
        let conn = rusqlite::Connection::open(self.database_path()).map_err(|e| {
            VaxtrackError::Storage {
                source: Box::new(e),
            }
        })?;
        conn.execute(sql, []).map_err(|e| VaxtrackError::Storage {
            source: Box::new(e),
        })
    }
}
