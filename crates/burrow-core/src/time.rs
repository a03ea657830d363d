// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The engine's notion of "now".
//!
//! Timestamps are `f64` seconds since the Unix epoch. TTL comparisons always
//! use values produced here (or supplied by the caller), never the database clock.

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn now_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// The timestamp `days` days before `reference`.
pub fn days_before(reference: f64, days: u32) -> f64 {
    reference - f64::from(days) * SECONDS_PER_DAY
}
