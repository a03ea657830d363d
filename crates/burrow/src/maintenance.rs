// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `burrow sweep` and `burrow purge-orphans`.

use burrow_core::BurrowError;
use burrow_core::time::{days_before, now_timestamp};
use burrow_storage::{PersistenceController, SweepReport};
use tracing::info;

/// Delete records older than `days` and expired notifications.
pub async fn sweep(controller: &PersistenceController, days: u32) -> Result<SweepReport, BurrowError> {
    let now = now_timestamp();
    let mut report = controller
        .delete_records_older_than(days_before(now, days))
        .await?;
    let expired = controller.delete_expired_user_notifications(now).await?;
    report.add("user_notifications", expired);
    info!(days, deleted = report.total(), "sweep finished");
    Ok(report)
}

pub async fn run_sweep(controller: &PersistenceController, days: u32) -> Result<(), BurrowError> {
    let report = sweep(controller, days).await?;
    println!("{report}");
    Ok(())
}

pub async fn run_purge_orphans(controller: &PersistenceController) -> Result<(), BurrowError> {
    let removed = controller.delete_messages_with_no_session().await?;
    info!(removed, "orphan purge finished");
    println!("removed {removed} orphaned records");
    Ok(())
}
