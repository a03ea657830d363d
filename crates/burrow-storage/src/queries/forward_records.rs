// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use burrow_core::BurrowError;
use burrow_core::types::ForwardRecord;
use rusqlite::params;

use crate::database::{Database, map_tr_err};

pub async fn insert_forward_record(
    db: &Database,
    record: &ForwardRecord,
) -> Result<i64, BurrowError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO forward_records (id, integration_id, payload, timestamp)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO NOTHING",
                params![record.id, record.integration_id, record.payload, record.timestamp],
            )?;
            Ok(record.id.unwrap_or_else(|| conn.last_insert_rowid()))
        })
        .await
        .map_err(map_tr_err)
}

/// All forward records, oldest first.
pub async fn forward_records(db: &Database) -> Result<Vec<ForwardRecord>, BurrowError> {
    db.connection()
        .call(|conn| -> Result<Vec<ForwardRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, integration_id, payload, timestamp
                 FROM forward_records ORDER BY id ASC",
            )?;
            let rows: Result<Vec<ForwardRecord>, _> = stmt
                .query_map([], |row| {
                    Ok(ForwardRecord {
                        id: Some(row.get(0)?),
                        integration_id: row.get(1)?,
                        payload: row.get(2)?,
                        timestamp: row.get(3)?,
                    })
                })?
                .collect();
            rows
        })
        .await
        .map_err(map_tr_err)
}

/// Delete all listed ids or none of them.
pub async fn delete_forward_record_ids(db: &Database, ids: &[i64]) -> Result<usize, BurrowError> {
    super::delete_ids_atomically(db, "forward_records", ids).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwarded_payloads_are_kept_until_acknowledged() {
        let db = Database::open_in_memory().await.unwrap();
        let first = insert_forward_record(&db, &ForwardRecord::new(28, b"one".to_vec()))
            .await
            .unwrap();
        insert_forward_record(&db, &ForwardRecord::new(92, b"two".to_vec()))
            .await
            .unwrap();

        let stored = forward_records(&db).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].integration_id, 28);
        assert_eq!(stored[1].payload, b"two".to_vec());

        assert_eq!(delete_forward_record_ids(&db, &[first]).await.unwrap(), 1);
        let left = forward_records(&db).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].integration_id, 92);
        db.close().await.unwrap();
    }
}
