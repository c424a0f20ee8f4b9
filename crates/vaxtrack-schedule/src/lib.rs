// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-exposure vaccination schedule engine.
//!
//! A bite patient gets four doses on days 0, 3, 7 and 28 counted in
//! calendar days from the first dose. [`ScheduleCalculator`] builds the
//! record and keeps those dates consistent, [`ScheduleStateMachine`] tracks
//! which doses were given, and [`ScheduleService`] runs both against a
//! [`ScheduleStore`] under optimistic concurrency.

pub mod calculator;
pub mod dose;
pub mod record;
pub mod service;
pub mod state;
pub mod store;
pub mod update;

pub use calculator::{
    DueDates, ScheduleCalculator, calendar_date_of, compute_due_dates, parse_start_date,
};
pub use dose::{DoseDay, DoseSlot, ObservedAnimalStatus};
pub use record::{DoseParts, ScheduleParts, ScheduleRecord, ScheduleStatus};
pub use service::{OverdueSchedule, RepairReport, ScheduleService};
pub use state::{ScheduleStateMachine, derive_status};
pub use store::{MemoryScheduleStore, ScheduleStore};
pub use update::{ScheduleField, ScheduleUpdate};
