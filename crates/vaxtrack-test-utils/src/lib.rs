// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for vaxtrack integration tests.
//!
//! [`TestHarness`] wires a temp SQLite store, a [`FixedClock`] and a
//! [`ScheduleService`] together so tests can drive the real stack.
//!
//! [`FixedClock`]: vaxtrack_core::FixedClock
//! [`ScheduleService`]: vaxtrack_schedule::ScheduleService

pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder};
