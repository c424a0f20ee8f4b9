// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for vaccination schedules.
//!
//! WAL-mode SQLite with embedded refinery migrations. Every statement runs on
//! the single `tokio-rusqlite` background thread, and schedule writes are
//! guarded by the row's `version` column.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteScheduleStore;
pub use database::Database;
pub use models::ScheduleRow;
