// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use burrow_core::BurrowError;
use burrow_core::types::Breadcrumb;
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Insert a breadcrumb and trim the table to the newest `max_breadcrumbs` rows.
pub async fn save_breadcrumb(
    db: &Database,
    breadcrumb: &Breadcrumb,
    max_breadcrumbs: usize,
) -> Result<i64, BurrowError> {
    let crumb = breadcrumb.clone();
    let keep = i64::try_from(max_breadcrumbs).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO breadcrumbs (session_uuid, message_uuid, payload, timestamp,
                                          session_number)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    crumb.session_uuid,
                    crumb.message_uuid,
                    crumb.payload,
                    crumb.timestamp,
                    crumb.session_number
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.execute(
                "DELETE FROM breadcrumbs WHERE id NOT IN (
                     SELECT id FROM breadcrumbs ORDER BY timestamp DESC, id DESC LIMIT ?1)",
                params![keep],
            )?;
            tx.commit()?;
            Ok(id)
        })
        .await
        .map_err(map_tr_err)
}

/// Stored breadcrumbs, oldest first.
pub async fn fetch_breadcrumbs(db: &Database) -> Result<Vec<Breadcrumb>, BurrowError> {
    db.connection()
        .call(|conn| -> Result<Vec<Breadcrumb>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, session_uuid, message_uuid, payload, timestamp, session_number
                 FROM breadcrumbs ORDER BY timestamp ASC, id ASC",
            )?;
            let crumbs: Result<Vec<Breadcrumb>, _> = stmt
                .query_map([], |row| {
                    Ok(Breadcrumb {
                        id: Some(row.get(0)?),
                        session_uuid: row.get(1)?,
                        message_uuid: row.get(2)?,
                        payload: row.get(3)?,
                        timestamp: row.get(4)?,
                        session_number: row.get(5)?,
                    })
                })?
                .collect();
            crumbs
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::types::{Message, MessageType, Session};

    #[tokio::test]
    async fn table_is_trimmed_to_newest_entries() {
        let db = Database::open_in_memory().await.unwrap();
        let session = Session::new(1);
        for ts in [5.0, 1.0, 4.0, 2.0, 3.0] {
            let message = Message::new(1, MessageType::Breadcrumb, vec![]).with_timestamp(ts);
            save_breadcrumb(&db, &Breadcrumb::from_message(&message, &session), 3)
                .await
                .unwrap();
        }

        let kept: Vec<f64> = fetch_breadcrumbs(&db)
            .await
            .unwrap()
            .iter()
            .map(|b| b.timestamp)
            .collect();
        assert_eq!(kept, [3.0, 4.0, 5.0]);
        db.close().await.unwrap();
    }
}
