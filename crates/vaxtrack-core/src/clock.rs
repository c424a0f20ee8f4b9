// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Clock capability injected into the schedule engine.
//!
//! Instants are always `DateTime<Utc>`. The clinic's calendar day is derived
//! from an instant through a fixed UTC offset, so "today" does not depend on
//! the host's local time zone.

use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};

/// Source of the current instant and the current clinic calendar date.
pub trait Clock: Send + Sync {
    /// The current instant, used for completion and update timestamps.
    fn now(&self) -> DateTime<Utc>;

    /// The clinic's current calendar date.
    fn today(&self) -> NaiveDate;
}

/// Wall-clock time read from the operating system.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// A clock whose calendar day follows the given UTC offset.
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// A clock whose calendar day is the UTC date.
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::utc()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

/// Deterministic clock for tests and replay. Time moves only when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
}

impl FixedClock {
    /// A clock frozen at `now`, with UTC calendar days.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
            offset: Utc.fix(),
        }
    }

    /// Use `offset` when deriving the calendar date.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Jump to a new instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Move the clock forward (or backward, for negative durations).
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.offset).date_naive()
    }
}
