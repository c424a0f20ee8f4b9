// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The four fixed administration points of the post-exposure regimen.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use vaxtrack_core::VaxtrackError;

/// One of the scheduled dose days, counted from the start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum DoseDay {
    Day0,
    Day3,
    Day7,
    Day28,
}

impl DoseDay {
    /// All dose days in administration order.
    pub const ALL: [DoseDay; 4] = [DoseDay::Day0, DoseDay::Day3, DoseDay::Day7, DoseDay::Day28];

    /// Number of calendar days after the start date.
    pub const fn offset_days(self) -> u32 {
        match self {
            DoseDay::Day0 => 0,
            DoseDay::Day3 => 3,
            DoseDay::Day7 => 7,
            DoseDay::Day28 => 28,
        }
    }

    /// Position within a record's dose array.
    pub(crate) const fn index(self) -> usize {
        match self {
            DoseDay::Day0 => 0,
            DoseDay::Day3 => 1,
            DoseDay::Day7 => 2,
            DoseDay::Day28 => 3,
        }
    }

    /// Display label. The day-28 dose reads as a booster when the biting
    /// animal was observed alive.
    pub fn label(self, observed: ObservedAnimalStatus) -> String {
        match (self, observed) {
            (DoseDay::Day28, ObservedAnimalStatus::Alive) => format!("{self} (Booster)"),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for DoseDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Day {}", self.offset_days())
    }
}

impl TryFrom<u32> for DoseDay {
    type Error = VaxtrackError;

    fn try_from(day: u32) -> Result<Self, Self::Error> {
        match day {
            0 => Ok(DoseDay::Day0),
            3 => Ok(DoseDay::Day3),
            7 => Ok(DoseDay::Day7),
            28 => Ok(DoseDay::Day28),
            _ => Err(VaxtrackError::InvalidDose { day }),
        }
    }
}

impl From<DoseDay> for u32 {
    fn from(day: DoseDay) -> Self {
        day.offset_days()
    }
}

/// What clinic staff observed about the biting animal. Display only.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ObservedAnimalStatus {
    Alive,
    Dead,
    #[default]
    Unknown,
}

/// Due date and completion state of a single dose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoseSlot {
    day: DoseDay,
    due_date: NaiveDate,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
}

impl DoseSlot {
    pub(crate) fn pending(day: DoseDay, due_date: NaiveDate) -> Self {
        Self {
            day,
            due_date,
            completed: false,
            completed_at: None,
        }
    }

    /// Rebuild a slot from persisted values, rejecting completion mismatches.
    pub(crate) fn restore(
        day: DoseDay,
        due_date: NaiveDate,
        completed: bool,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, VaxtrackError> {
        if completed != completed_at.is_some() {
            return Err(VaxtrackError::InvalidRecord(format!(
                "{day}: completed={completed} but completed_at is {}",
                if completed_at.is_some() { "set" } else { "missing" }
            )));
        }
        Ok(Self {
            day,
            due_date,
            completed,
            completed_at,
        })
    }

    pub fn day(&self) -> DoseDay {
        self.day
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub(crate) fn set_due_date(&mut self, due_date: NaiveDate) {
        self.due_date = due_date;
    }

    /// Set the completion flag, keeping `completed_at` in step with it.
    ///
    /// An already-completed dose keeps its original timestamp.
    pub(crate) fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.completed = completed;
        self.sync_completed_at(now);
    }

    /// Change only the flag. Callers must follow up with `sync_completed_at`.
    pub(crate) fn set_flag(&mut self, completed: bool) {
        self.completed = completed;
    }

    /// Stamp completed doses that lack a timestamp and clear stale ones.
    pub(crate) fn sync_completed_at(&mut self, now: DateTime<Utc>) {
        match (self.completed, self.completed_at) {
            (true, None) => self.completed_at = Some(now),
            (false, Some(_)) => self.completed_at = None,
            _ => {}
        }
    }
}
