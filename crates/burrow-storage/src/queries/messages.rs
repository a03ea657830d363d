// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-scoped message operations.

use burrow_core::BurrowError;
use burrow_core::types::{Message, MessageType, UploadStatus};
use rusqlite::params;

use super::{count_where, decode_all, parse_message_type, parse_upload_status};
use crate::database::{Database, map_tr_err};

const TABLE: &str = "messages";

struct MessageRow {
    id: i64,
    session_id: i64,
    message_type: String,
    uuid: String,
    timestamp: f64,
    payload: Vec<u8>,
    upload_status: i64,
    upload_id: Option<i64>,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        session_id: row.get(1)?,
        message_type: row.get(2)?,
        uuid: row.get(3)?,
        timestamp: row.get(4)?,
        payload: row.get(5)?,
        upload_status: row.get(6)?,
        upload_id: row.get(7)?,
    })
}

fn decode(raw: MessageRow) -> Result<Message, BurrowError> {
    Ok(Message {
        id: Some(raw.id),
        session_id: raw.session_id,
        message_type: parse_message_type(TABLE, raw.id, &raw.message_type)?,
        uuid: raw.uuid,
        timestamp: raw.timestamp,
        payload: raw.payload,
        upload_status: parse_upload_status(TABLE, raw.id, raw.upload_status)?,
        upload_id: raw.upload_id,
    })
}

/// Save a message; returns its id.
pub async fn insert_message(db: &Database, message: &Message) -> Result<i64, BurrowError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO messages (id, session_id, message_type, uuid, timestamp, payload,
                                       upload_status, upload_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                     upload_status = excluded.upload_status,
                     upload_id = excluded.upload_id",
                params![
                    message.id,
                    message.session_id,
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

async fn select(
    db: &Database,
    filter: &'static str,
    session_id: i64,
    extra: Option<String>,
) -> Result<Vec<Message>, BurrowError> {
    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<MessageRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, session_id, message_type, uuid, timestamp, payload, upload_status,
                        upload_id
                 FROM messages WHERE session_id = ?1 {filter} ORDER BY id ASC"
            ))?;
            let rows: Result<Vec<MessageRow>, _> = match extra {
                Some(value) => stmt.query_map(params![session_id, value], read_row)?.collect(),
                None => stmt.query_map(params![session_id], read_row)?.collect(),
            };
            rows
        })
        .await
        .map_err(map_tr_err)?;
    Ok(decode_all(rows, decode))
}

/// Every message of a session in insertion order.
pub async fn messages_in_session(
    db: &Database,
    session_id: i64,
) -> Result<Vec<Message>, BurrowError> {
    select(db, "", session_id, None).await
}

/// Unsent messages of a session not claimed by any open upload.
pub async fn messages_for_upload_in_session(
    db: &Database,
    session_id: i64,
) -> Result<Vec<Message>, BurrowError> {
    select(
        db,
        "AND upload_status = 0 AND upload_id IS NULL",
        session_id,
        None,
    )
    .await
}

/// Messages already packed into an upload with the flag operation.
pub async fn uploaded_messages_in_session(
    db: &Database,
    session_id: i64,
    exclude_network_performance: bool,
) -> Result<Vec<Message>, BurrowError> {
    if exclude_network_performance {
        select(
            db,
            "AND upload_status = 1 AND message_type != ?2",
            session_id,
            Some(MessageType::NetworkPerformance.to_string()),
        )
        .await
    } else {
        select(db, "AND upload_status = 1", session_id, None).await
    }
}

/// The session-end message of a session, if one was recorded.
pub async fn session_end_message(
    db: &Database,
    session_id: i64,
) -> Result<Option<Message>, BurrowError> {
    let mut found = select(
        db,
        "AND message_type = ?2",
        session_id,
        Some(MessageType::SessionEnd.to_string()),
    )
    .await?;
    Ok(found.pop())
}

pub async fn count_for_upload_in_session(
    db: &Database,
    session_id: i64,
) -> Result<usize, BurrowError> {
    count_where(
        db,
        "SELECT COUNT(*) FROM messages
         WHERE session_id = ?1 AND upload_status = 0 AND upload_id IS NULL",
        Some(session_id),
    )
    .await
}

/// Delete messages and commands whose session no longer exists.
pub async fn delete_messages_with_no_session(db: &Database) -> Result<usize, BurrowError> {
    db.connection()
        .call(|conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            let messages = tx.execute(
                "DELETE FROM messages
                 WHERE session_id NOT IN (SELECT id FROM sessions)",
                [],
            )?;
            let commands = tx.execute(
                "DELETE FROM commands
                 WHERE session_id NOT IN (SELECT id FROM sessions)",
                [],
            )?;
            tx.commit()?;
            Ok(messages + commands)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every network-performance message that has not been packed yet.
pub async fn delete_network_performance_messages(db: &Database) -> Result<usize, BurrowError> {
    let code = MessageType::NetworkPerformance.to_string();
    let batch = UploadStatus::Batch.as_i64();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM messages
                 WHERE message_type = ?1 AND upload_status = ?2 AND upload_id IS NULL",
                params![code, batch],
            )
        })
        .await
        .map_err(map_tr_err)
}
