// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence and batching engine for the Burrow telemetry SDK.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single
//! serialized connection via `tokio-rusqlite`, typed query modules for every
//! record table, and the [`PersistenceController`] facade used by the rest of
//! the SDK.

pub mod adapter;
pub mod controller;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use controller::PersistenceController;
pub use database::Database;
pub use models::*;
pub use queries::maintenance::SweepReport;
pub use queries::uploads::Pipeline;
