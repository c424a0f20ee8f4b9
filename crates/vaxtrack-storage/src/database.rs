// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection lifecycle: PRAGMA setup, migrations, WAL checkpoint on close.
//!
//! All statements go through tokio-rusqlite's single background thread.
//! Do not open extra connections for writes.

use std::path::Path;

use tracing::debug;
use vaxtrack_core::VaxtrackError;

use crate::migrations::run_migrations;

/// Map a tokio-rusqlite failure into `VaxtrackError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> VaxtrackError {
    VaxtrackError::Storage {
        source: Box::new(e),
    }
}

/// Map a synchronous rusqlite failure into `VaxtrackError::Storage`.
pub(crate) fn map_sql_err(e: rusqlite::Error) -> VaxtrackError {
    VaxtrackError::Storage {
        source: Box::new(e),
    }
}

/// Open SQLite database handle.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` and migrate it.
    ///
    /// The journal mode is persisted in the file, so it is set once on a
    /// short-lived synchronous connection together with the migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, VaxtrackError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| VaxtrackError::Storage {
                source: Box::new(e),
            })?;
        }

        let owned = path.to_string();
        tokio::task::spawn_blocking(move || prepare(&owned, wal_mode))
            .await
            .map_err(|e| VaxtrackError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| VaxtrackError::Storage {
                source: Box::new(e),
            })?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA synchronous = NORMAL;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main file is self-contained.
    pub async fn close(&self) -> Result<(), VaxtrackError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Set the journal mode and bring the schema up to date.
fn prepare(path: &str, wal_mode: bool) -> Result<(), VaxtrackError> {
    let mut conn = rusqlite::Connection::open(path).map_err(map_sql_err)?;
    let mode = if wal_mode { "WAL" } else { "DELETE" };
    let applied: String = conn
        .pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))
        .map_err(map_sql_err)?;
    debug!(journal_mode = %applied, "journal mode set");
    run_migrations(&mut conn)
}
