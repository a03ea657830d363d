// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Burrow integration tests.
//!
//! # Components
//!
//! - [`TestHarness`] - An open [`PersistenceController`](burrow_storage::PersistenceController)
//!   backed by a throwaway on-disk database
//! - [`fixtures`] - Record constructors with fixed timestamps and seeding helpers

pub mod fixtures;
pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder};
