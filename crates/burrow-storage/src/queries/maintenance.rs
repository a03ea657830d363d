// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retention sweeps and store diagnostics.

use std::fmt;

use burrow_core::BurrowError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::migrations;

/// Tables swept by age and the column compared against the cutoff.
const AGED_TABLES: &[(&str, &str)] = &[
    ("messages", "timestamp"),
    ("uploads", "timestamp"),
    ("commands", "timestamp"),
    ("standalone_messages", "timestamp"),
    ("standalone_uploads", "timestamp"),
    ("standalone_commands", "timestamp"),
    ("forward_records", "timestamp"),
    ("breadcrumbs", "timestamp"),
    ("user_notifications", "receipt_time"),
    ("product_bags", "timestamp"),
    ("segment_memberships", "timestamp"),
];

/// Tables reported by [`table_counts`].
pub const COUNTED_TABLES: &[&str] = &[
    "sessions",
    "messages",
    "uploads",
    "commands",
    "standalone_messages",
    "standalone_uploads",
    "standalone_commands",
    "forward_records",
    "consumer_info",
    "cookies",
    "user_notifications",
    "product_bags",
    "segments",
    "breadcrumbs",
];

/// Rows removed per table by one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: Vec<(&'static str, usize)>,
}

impl SweepReport {
    /// Count `n` more rows for `table`, merging with an existing entry.
    pub fn add(&mut self, table: &'static str, n: usize) {
        match self.deleted.iter_mut().find(|(name, _)| *name == table) {
            Some((_, count)) => *count += n,
            None => self.deleted.push((table, n)),
        }
    }

    pub fn total(&self) -> usize {
        self.deleted.iter().map(|(_, n)| n).sum()
    }

    pub fn deleted_from(&self, table: &str) -> usize {
        self.deleted
            .iter()
            .find(|(name, _)| *name == table)
            .map_or(0, |(_, n)| *n)
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (table, count) in self.deleted.iter().filter(|(_, n)| *n > 0) {
            writeln!(f, "{table:<22} {count}")?;
        }
        write!(f, "{:<22} {}", "total", self.total())
    }
}

/// Delete every row older than `cutoff` (strictly less) in one transaction.
///
/// Archived sessions are aged by `end_time`; active sessions are never swept.
pub async fn delete_records_older_than(
    db: &Database,
    cutoff: f64,
) -> Result<SweepReport, BurrowError> {
    db.connection()
        .call(move |conn| -> Result<SweepReport, rusqlite::Error> {
            let tx = conn.transaction()?;
            let mut report = SweepReport::default();
            for &(table, column) in AGED_TABLES {
                let n = tx.execute(
                    &format!("DELETE FROM {table} WHERE {column} < ?1"),
                    params![cutoff],
                )?;
                report.add(table, n);
            }
            let n = tx.execute(
                "DELETE FROM sessions WHERE status = 'archived' AND end_time < ?1",
                params![cutoff],
            )?;
            report.add("sessions", n);
            tx.commit()?;
            Ok(report)
        })
        .await
        .map_err(map_tr_err)
}

/// Row count of every data table, in [`COUNTED_TABLES`] order.
pub async fn table_counts(db: &Database) -> Result<Vec<(&'static str, usize)>, BurrowError> {
    db.connection()
        .call(|conn| -> Result<Vec<(&'static str, usize)>, rusqlite::Error> {
            COUNTED_TABLES
                .iter()
                .map(|&table| -> Result<(&'static str, usize), rusqlite::Error> {
                    let n: i64 =
                        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                            row.get(0)
                        })?;
                    Ok((table, usize::try_from(n).unwrap_or_default()))
                })
                .collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Result lines of `PRAGMA integrity_check`; a healthy store yields `["ok"]`.
pub async fn integrity_check(db: &Database) -> Result<Vec<String>, BurrowError> {
    db.connection()
        .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare("PRAGMA integrity_check")?;
            let lines: Result<Vec<String>, _> = stmt.query_map([], |row| row.get(0))?.collect();
            lines
        })
        .await
        .map_err(map_tr_err)
}

pub async fn schema_version(db: &Database) -> Result<Option<i64>, BurrowError> {
    db.connection()
        .call(|conn| -> Result<Option<i64>, rusqlite::Error> { migrations::current_version(conn) })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::types::{
        ForwardRecord, MembershipAction, Message, MessageType, NotificationMode, ProductBag,
        Segment, SegmentMembership, Session, UserNotification,
    };

    use crate::queries::{
        forward_records, messages, notifications, product_bags, segments, sessions,
    };

    #[tokio::test]
    async fn sweep_is_strictly_before_cutoff() {
        let db = Database::open_in_memory().await.unwrap();
        for ts in [10.0, 20.0, 30.0] {
            messages::insert_message(
                &db,
                &Message::new(1, MessageType::Event, vec![]).with_timestamp(ts),
            )
            .await
            .unwrap();
            let mut record = ForwardRecord::new(1, vec![]);
            record.timestamp = ts;
            forward_records::insert_forward_record(&db, &record).await.unwrap();
        }

        let report = delete_records_older_than(&db, 20.0).await.unwrap();
        assert_eq!(report.deleted_from("messages"), 1);
        assert_eq!(report.deleted_from("forward_records"), 1);
        assert_eq!(report.total(), 2);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn side_tables_are_aged_too() {
        let db = Database::open_in_memory().await.unwrap();
        for (name, ts) in [("old", 5.0), ("new", 50.0)] {
            let mut bag = ProductBag::new(name, vec![]);
            bag.timestamp = ts;
            product_bags::save_product_bag(&db, &bag).await.unwrap();

            let mut notification = UserNotification::new(NotificationMode::Local, vec![], 0.0);
            notification.receipt_time = ts;
            notification.expiration = 1_000.0;
            notifications::save_notification(&db, &notification).await.unwrap();
        }
        let mut segment = Segment::new(1, "buyers");
        for (action, ts) in [(MembershipAction::Add, 5.0), (MembershipAction::Drop, 50.0)] {
            segment.memberships.push(SegmentMembership {
                action,
                timestamp: ts,
            });
        }
        segments::save_segment(&db, &segment).await.unwrap();

        let report = delete_records_older_than(&db, 10.0).await.unwrap();
        assert_eq!(report.deleted_from("product_bags"), 1);
        assert_eq!(report.deleted_from("user_notifications"), 1);
        assert_eq!(report.deleted_from("segment_memberships"), 1);

        let bags = product_bags::fetch_product_bags(&db).await.unwrap();
        assert_eq!(bags.len(), 1);
        assert_eq!(bags[0].name, "new");
        let kept = segments::fetch_segments(&db).await.unwrap();
        assert_eq!(kept[0].memberships.len(), 1);
        assert_eq!(kept[0].memberships[0].timestamp, 50.0);
        db.close().await.unwrap();
    }

    #[test]
    fn report_merges_entries_per_table() {
        let mut report = SweepReport::default();
        report.add("messages", 2);
        report.add("user_notifications", 1);
        report.add("messages", 3);
        assert_eq!(report.deleted.len(), 2);
        assert_eq!(report.deleted_from("messages"), 5);
        assert_eq!(report.total(), 6);
    }

    #[tokio::test]
    async fn only_archived_sessions_are_aged() {
        let db = Database::open_in_memory().await.unwrap();
        let mut active = Session::new(1);
        active.start_time = 1.0;
        active.end_time = 1.0;
        sessions::save_session(&db, &active).await.unwrap();

        let mut done = Session::new(2);
        done.start_time = 1.0;
        done.end_time = 2.0;
        done.id = Some(sessions::save_session(&db, &done).await.unwrap());
        sessions::archive_session(&db, &done).await.unwrap();

        let report = delete_records_older_than(&db, 10.0).await.unwrap();
        assert_eq!(report.deleted_from("sessions"), 1);
        let left = sessions::fetch_sessions(&db).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].session_number, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn diagnostics_on_fresh_store() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(integrity_check(&db).await.unwrap(), ["ok"]);
        assert_eq!(schema_version(&db).await.unwrap(), Some(2));
        let counts = table_counts(&db).await.unwrap();
        assert_eq!(counts.len(), COUNTED_TABLES.len());
        assert!(counts.iter().all(|(_, n)| *n == 0));
        db.close().await.unwrap();
    }
}
