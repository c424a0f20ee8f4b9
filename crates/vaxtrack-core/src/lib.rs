// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the vaxtrack workspace.
//!
//! This crate provides the error taxonomy, opaque identifiers, and the
//! injectable clock used by the schedule engine and its collaborators.
//! It has no knowledge of schedules themselves.

pub mod clock;
pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::VaxtrackError;
pub use types::{HealthStatus, PatientRef, ScheduleId};
