// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session rows, the previous-session snapshot, and crash recovery lookups.

use std::collections::BTreeMap;
use std::str::FromStr;

use burrow_core::BurrowError;
use burrow_core::types::{Session, SessionStatus};
use rusqlite::{OptionalExtension, params};
use tracing::{debug, warn};

use super::{decode_all, decode_error};
use crate::database::{Database, map_tr_err};

const TABLE: &str = "sessions";
const COLUMNS: &str = "id, uuid, start_time, end_time, background_time, attributes, \
                       is_background, status, session_number";

struct SessionRow {
    id: i64,
    uuid: String,
    start_time: f64,
    end_time: f64,
    background_time: f64,
    attributes: String,
    is_background: bool,
    status: String,
    session_number: i64,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        uuid: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        background_time: row.get(4)?,
        attributes: row.get(5)?,
        is_background: row.get(6)?,
        status: row.get(7)?,
        session_number: row.get(8)?,
    })
}

fn decode(raw: SessionRow) -> Result<Session, BurrowError> {
    let attributes: BTreeMap<String, serde_json::Value> = serde_json::from_str(&raw.attributes)
        .map_err(|e| decode_error(TABLE, raw.id, e))?;
    let status = SessionStatus::from_str(&raw.status)
        .map_err(|_| decode_error(TABLE, raw.id, format!("unknown status `{}`", raw.status)))?;
    Ok(Session {
        id: Some(raw.id),
        uuid: raw.uuid,
        start_time: raw.start_time,
        end_time: raw.end_time,
        background_time: raw.background_time,
        attributes,
        is_background: raw.is_background,
        status,
        session_number: raw.session_number,
    })
}

fn encode_attributes(session: &Session) -> Result<String, BurrowError> {
    serde_json::to_string(&session.attributes).map_err(|e| BurrowError::Internal(e.to_string()))
}

/// Insert-or-replace a session row; returns its id.
fn upsert(
    conn: &rusqlite::Connection,
    session: &Session,
    attributes: &str,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO sessions (id, uuid, start_time, end_time, background_time, attributes,
                               is_background, status, session_number)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
             uuid = excluded.uuid,
             start_time = excluded.start_time,
             end_time = excluded.end_time,
             background_time = excluded.background_time,
             attributes = excluded.attributes,
             is_background = excluded.is_background,
             status = excluded.status,
             session_number = excluded.session_number",
        params![
            session.id,
            session.uuid,
            session.start_time,
            session.end_time,
            session.background_time,
            attributes,
            session.is_background,
            session.status.to_string(),
            session.session_number,
        ],
    )?;
    Ok(session.id.unwrap_or_else(|| conn.last_insert_rowid()))
}

/// Insert a session, or replace it when its id is already stored.
pub async fn save_session(db: &Database, session: &Session) -> Result<i64, BurrowError> {
    let session = session.clone();
    let attributes = encode_attributes(&session)?;
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> { upsert(conn, &session, &attributes) })
        .await
        .map_err(map_tr_err)
}

/// Replace a stored session. A session that no longer exists is left absent.
pub async fn update_session(db: &Database, session: &Session) -> Result<bool, BurrowError> {
    let Some(id) = session.id else {
        debug!(uuid = %session.uuid, "update of unsaved session ignored");
        return Ok(false);
    };
    let session = session.clone();
    let attributes = encode_attributes(&session)?;
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let updated = conn.execute(
                "UPDATE sessions SET uuid = ?2, start_time = ?3, end_time = ?4,
                     background_time = ?5, attributes = ?6, is_background = ?7,
                     status = ?8, session_number = ?9
                 WHERE id = ?1",
                params![
                    id,
                    session.uuid,
                    session.start_time,
                    session.end_time,
                    session.background_time,
                    attributes,
                    session.is_background,
                    session.status.to_string(),
                    session.session_number,
                ],
            )?;
            Ok(updated > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Finalize a session and record it as the previous session.
///
/// The end time never precedes the start time. The session row and the
/// snapshot are written in one transaction; the finalized copy is returned.
pub async fn archive_session(db: &Database, session: &Session) -> Result<Session, BurrowError> {
    let mut archived = session.clone();
    archived.status = SessionStatus::Archived;
    archived.end_time = archived.end_time.max(archived.start_time);
    let attributes = encode_attributes(&archived)?;

    db.connection()
        .call(move |conn| -> Result<Session, rusqlite::Error> {
            let tx = conn.transaction()?;
            let id = upsert(&tx, &archived, &attributes)?;
            archived.id = Some(id);
            let snapshot = serde_json::to_string(&archived)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            tx.execute(
                "INSERT INTO previous_session (id, session_id, snapshot) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET session_id = excluded.session_id,
                                               snapshot = excluded.snapshot",
                params![id, snapshot],
            )?;
            tx.commit()?;
            Ok(archived)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a session together with its messages and commands.
///
/// Uploads are kept: they are the only copy of already-packed messages.
pub async fn delete_session(db: &Database, id: i64) -> Result<(), BurrowError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM messages WHERE session_id = ?1", params![id])?;
            tx.execute("DELETE FROM commands WHERE session_id = ?1", params![id])?;
            tx.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

async fn select(
    db: &Database,
    filter: &'static str,
    param: Option<i64>,
) -> Result<Vec<Session>, BurrowError> {
    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<SessionRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM sessions {filter}"))?;
            let rows: Result<Vec<SessionRow>, _> = match param {
                Some(value) => stmt.query_map(params![value], read_row)?.collect(),
                None => stmt.query_map([], read_row)?.collect(),
            };
            rows
        })
        .await
        .map_err(map_tr_err)?;
    Ok(decode_all(rows, decode))
}

/// All sessions, oldest first.
pub async fn fetch_sessions(db: &Database) -> Result<Vec<Session>, BurrowError> {
    select(db, "ORDER BY start_time ASC, id ASC", None).await
}

pub async fn fetch_session(db: &Database, id: i64) -> Result<Option<Session>, BurrowError> {
    Ok(select(db, "WHERE id = ?1", Some(id)).await?.into_iter().next())
}

/// The most recent session left active, i.e. not archived before the process died.
pub async fn fetch_session_from_crash(db: &Database) -> Result<Option<Session>, BurrowError> {
    Ok(select(
        db,
        "WHERE status = 'active' ORDER BY start_time DESC, id DESC LIMIT 1",
        None,
    )
    .await?
    .into_iter()
    .next())
}

/// Every session still active, newest first.
pub async fn fetch_possible_sessions_from_crash(
    db: &Database,
) -> Result<Vec<Session>, BurrowError> {
    select(
        db,
        "WHERE status = 'active' ORDER BY start_time DESC, id DESC",
        None,
    )
    .await
}

pub async fn fetch_previous_session(db: &Database) -> Result<Option<Session>, BurrowError> {
    let snapshot = db
        .connection()
        .call(|conn| -> Result<Option<(i64, String)>, rusqlite::Error> {
            conn.query_row(
                "SELECT session_id, snapshot FROM previous_session WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;

    Ok(snapshot.and_then(|(session_id, json)| {
        match serde_json::from_str::<Session>(&json) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(session_id, error = %e, "skipping undecodable previous session");
                None
            }
        }
    }))
}

pub async fn delete_previous_session(db: &Database) -> Result<(), BurrowError> {
    db.connection()
        .call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM previous_session", [])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
