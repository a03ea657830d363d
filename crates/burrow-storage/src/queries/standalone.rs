// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messages captured outside any session.

use burrow_core::BurrowError;
use burrow_core::types::StandaloneMessage;
use rusqlite::params;

use super::{count_where, decode_all, parse_message_type, parse_upload_status};
use crate::database::{Database, map_tr_err};

const TABLE: &str = "standalone_messages";

struct StandaloneRow {
    id: i64,
    message_type: String,
    uuid: String,
    timestamp: f64,
    payload: Vec<u8>,
    upload_status: i64,
    upload_id: Option<i64>,
}

fn decode(raw: StandaloneRow) -> Result<StandaloneMessage, BurrowError> {
    Ok(StandaloneMessage {
        id: Some(raw.id),
        message_type: parse_message_type(TABLE, raw.id, &raw.message_type)?,
        uuid: raw.uuid,
        timestamp: raw.timestamp,
        payload: raw.payload,
        upload_status: parse_upload_status(TABLE, raw.id, raw.upload_status)?,
        upload_id: raw.upload_id,
    })
}

pub async fn insert_standalone_message(
    db: &Database,
    message: &StandaloneMessage,
) -> Result<i64, BurrowError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO standalone_messages (id, message_type, uuid, timestamp, payload,
                                                  upload_status, upload_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                     upload_status = excluded.upload_status,
                     upload_id = excluded.upload_id",
                params![
                    message.id,
                    message.message_type.to_string(),
                    message.uuid,
                    message.timestamp,
                    message.payload,
                    message.upload_status.as_i64(),
                    message.upload_id,
                ],
            )?;
            Ok(message.id.unwrap_or_else(|| conn.last_insert_rowid()))
        })
        .await
        .map_err(map_tr_err)
}

async fn select(db: &Database, filter: &'static str) -> Result<Vec<StandaloneMessage>, BurrowError> {
    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<StandaloneRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, message_type, uuid, timestamp, payload, upload_status, upload_id
                 FROM standalone_messages {filter} ORDER BY id ASC"
            ))?;
            let rows: Result<Vec<StandaloneRow>, _> = stmt
                .query_map([], |row| {
                    Ok(StandaloneRow {
                        id: row.get(0)?,
                        message_type: row.get(1)?,
                        uuid: row.get(2)?,
                        timestamp: row.get(3)?,
                        payload: row.get(4)?,
                        upload_status: row.get(5)?,
                        upload_id: row.get(6)?,
                    })
                })?
                .collect();
            rows
        })
        .await
        .map_err(map_tr_err)?;
    Ok(decode_all(rows, decode))
}

pub async fn standalone_messages(db: &Database) -> Result<Vec<StandaloneMessage>, BurrowError> {
    select(db, "").await
}

/// Unsent standalone messages not claimed by an open standalone upload.
pub async fn standalone_messages_for_upload(
    db: &Database,
) -> Result<Vec<StandaloneMessage>, BurrowError> {
    select(db, "WHERE upload_status = 0 AND upload_id IS NULL").await
}

pub async fn delete_standalone_message(db: &Database, id: i64) -> Result<(), BurrowError> {
    super::delete_by_id(db, TABLE, id).await.map(|_| ())
}

/// Delete all listed ids or none of them.
pub async fn delete_standalone_message_ids(
    db: &Database,
    ids: &[i64],
) -> Result<usize, BurrowError> {
    super::delete_ids_atomically(db, TABLE, ids).await
}

pub async fn count_standalone_messages(db: &Database) -> Result<usize, BurrowError> {
    count_where(db, "SELECT COUNT(*) FROM standalone_messages", None).await
}
