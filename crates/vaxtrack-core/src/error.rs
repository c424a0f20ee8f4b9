// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the vaxtrack workspace.

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{PatientRef, ScheduleId};

/// The primary error type used by the schedule engine and its collaborators.
#[derive(Debug, Error)]
pub enum VaxtrackError {
    /// A schedule already exists for this patient.
    #[error("patient {patient_ref} already has a vaccination schedule")]
    DuplicateSchedule { patient_ref: PatientRef },

    /// A dose day outside {0, 3, 7, 28} was requested.
    #[error("invalid dose day {day}: expected one of 0, 3, 7, 28")]
    InvalidDose { day: u32 },

    /// A referenced schedule or patient does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A date string could not be interpreted as a calendar date.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// Calendar arithmetic left chrono's representable range.
    #[error("{start} + {days} days is outside the supported date range")]
    DateOutOfRange { start: NaiveDate, days: u64 },

    /// A persisted record violates the completion invariants.
    #[error("invalid schedule record: {0}")]
    InvalidRecord(String),

    /// The record changed underneath a read-modify-write cycle.
    #[error("schedule {schedule_id} was modified concurrently")]
    Conflict { schedule_id: ScheduleId },

    /// Configuration errors (invalid TOML, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VaxtrackError {
    /// Whether the error was caused by the caller's input rather than the system.
    ///
    /// An API layer maps these to client-error responses.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            VaxtrackError::DuplicateSchedule { .. }
                | VaxtrackError::InvalidDose { .. }
                | VaxtrackError::NotFound { .. }
                | VaxtrackError::InvalidDate(_)
                | VaxtrackError::DateOutOfRange { .. }
        )
    }

    /// Shorthand for a missing schedule keyed by patient.
    pub fn schedule_not_found(patient_ref: &PatientRef) -> Self {
        VaxtrackError::NotFound {
            entity: "schedule",
            key: patient_ref.to_string(),
        }
    }
}
