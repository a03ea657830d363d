// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch lifecycle: claiming messages into uploads and terminating uploads.
//!
//! A message moves `unsent -> claimed -> (deleted | flagged)` when an upload
//! is saved, and back to `unsent` when its upload is released. The claim is
//! checked and taken inside the same transaction that inserts the upload, so
//! two uploads built from overlapping fetches can never both succeed.

use std::collections::HashSet;

use burrow_core::BurrowError;
use burrow_core::types::{PersistenceOperation, StandaloneUpload, Upload, UploadStatus};
use rusqlite::{OptionalExtension, params};
use tracing::{debug, warn};

use super::{decode_all, decode_error};
use crate::database::{Database, map_tr_err};

/// Which message/upload table pair an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    /// `messages` and `uploads`.
    Session,
    /// `standalone_messages` and `standalone_uploads`.
    Standalone,
}

impl Pipeline {
    pub fn uploads_table(self) -> &'static str {
        match self {
            Self::Session => "uploads",
            Self::Standalone => "standalone_uploads",
        }
    }

    pub fn messages_table(self) -> &'static str {
        match self {
            Self::Session => "messages",
            Self::Standalone => "standalone_messages",
        }
    }
}

/// Result of the claim-and-insert transaction.
enum ClaimOutcome {
    Saved(i64),
    /// Listed ids that were missing, already claimed or already uploaded.
    Conflict(Vec<i64>),
}

/// Upload columns shared by both pipelines.
struct UploadRow {
    id: i64,
    session_id: Option<i64>,
    uuid: String,
    message_ids: String,
    payload: Vec<u8>,
    timestamp: f64,
    retry_count: u32,
}

struct NewUpload {
    session_id: Option<i64>,
    uuid: String,
    payload: Vec<u8>,
    timestamp: f64,
}

fn claim_and_insert(
    conn: &mut rusqlite::Connection,
    pipeline: Pipeline,
    upload: NewUpload,
    message_ids: &[i64],
    operation: PersistenceOperation,
) -> Result<ClaimOutcome, rusqlite::Error> {
    let messages = pipeline.messages_table();
    let tx = conn.transaction()?;

    let mut conflicts = Vec::new();
    {
        let mut stmt = tx.prepare(&format!(
            "SELECT upload_status, upload_id FROM {messages} WHERE id = ?1"
        ))?;
        for id in message_ids {
            let state: Option<(i64, Option<i64>)> = stmt
                .query_row(params![id], |row| Ok((row.get(0)?, row.get(1)?)))
                .optional()?;
            match state {
                Some((status, None)) if status == UploadStatus::Batch.as_i64() => {}
                _ => conflicts.push(*id),
            }
        }
    }
    if !conflicts.is_empty() {
        // Dropping the transaction rolls it back.
        return Ok(ClaimOutcome::Conflict(conflicts));
    }

    let ids_json = serde_json::to_string(message_ids)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    match upload.session_id {
        Some(session_id) => tx.execute(
            "INSERT INTO uploads (session_id, uuid, message_ids, payload, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![session_id, upload.uuid, ids_json, upload.payload, upload.timestamp],
        )?,
        None => tx.execute(
            "INSERT INTO standalone_uploads (uuid, message_ids, payload, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![upload.uuid, ids_json, upload.payload, upload.timestamp],
        )?,
    };
    let upload_id = tx.last_insert_rowid();

    match operation {
        PersistenceOperation::Delete => {
            let mut stmt = tx.prepare(&format!("DELETE FROM {messages} WHERE id = ?1"))?;
            for id in message_ids {
                stmt.execute(params![id])?;
            }
        }
        PersistenceOperation::Flag => {
            let mut stmt = tx.prepare(&format!(
                "UPDATE {messages} SET upload_status = ?1, upload_id = ?2 WHERE id = ?3"
            ))?;
            for id in message_ids {
                stmt.execute(params![UploadStatus::Uploaded.as_i64(), upload_id, id])?;
            }
        }
    }

    tx.commit()?;
    Ok(ClaimOutcome::Saved(upload_id))
}

async fn save(
    db: &Database,
    pipeline: Pipeline,
    upload: NewUpload,
    message_ids: &[i64],
    operation: PersistenceOperation,
) -> Result<i64, BurrowError> {
    // Members keep the caller's batch order; repeats are claimed once.
    let mut seen = HashSet::new();
    let members: Vec<i64> = message_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();
    if members.len() != message_ids.len() {
        debug!(requested = message_ids.len(), unique = members.len(), "duplicate message ids dropped");
    }
    let member_count = members.len();

    let outcome = db
        .connection()
        .call(move |conn| -> Result<ClaimOutcome, rusqlite::Error> {
            claim_and_insert(conn, pipeline, upload, &members, operation)
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        ClaimOutcome::Saved(id) => {
            debug!(
                table = pipeline.uploads_table(),
                upload_id = id,
                members = member_count,
                %operation,
                "upload saved"
            );
            Ok(id)
        }
        ClaimOutcome::Conflict(message_ids) => {
            warn!(
                table = pipeline.uploads_table(),
                conflicts = ?message_ids,
                "upload rejected: members already claimed"
            );
            Err(BurrowError::AlreadyClaimed { message_ids })
        }
    }
}

/// Save a session upload and claim its members in one transaction.
///
/// Fails with [`BurrowError::AlreadyClaimed`] and writes nothing when any
/// listed message is missing, claimed by another upload, or already uploaded.
pub async fn save_upload(
    db: &Database,
    upload: &Upload,
    message_ids: &[i64],
    operation: PersistenceOperation,
) -> Result<i64, BurrowError> {
    let new = NewUpload {
        session_id: Some(upload.session_id),
        uuid: upload.uuid.clone(),
        payload: upload.payload.clone(),
        timestamp: upload.timestamp,
    };
    save(db, Pipeline::Session, new, message_ids, operation).await
}

/// Standalone counterpart of [`save_upload`].
pub async fn save_standalone_upload(
    db: &Database,
    upload: &StandaloneUpload,
    message_ids: &[i64],
    operation: PersistenceOperation,
) -> Result<i64, BurrowError> {
    let new = NewUpload {
        session_id: None,
        uuid: upload.uuid.clone(),
        payload: upload.payload.clone(),
        timestamp: upload.timestamp,
    };
    save(db, Pipeline::Standalone, new, message_ids, operation).await
}

fn decode_member_ids(table: &'static str, raw: &UploadRow) -> Result<Vec<i64>, BurrowError> {
    serde_json::from_str(&raw.message_ids).map_err(|e| decode_error(table, raw.id, e))
}

async fn select(
    db: &Database,
    pipeline: Pipeline,
    session_id: Option<i64>,
) -> Result<Vec<UploadRow>, BurrowError> {
    db.connection()
        .call(move |conn| -> Result<Vec<UploadRow>, rusqlite::Error> {
            let read = |row: &rusqlite::Row<'_>| -> rusqlite::Result<UploadRow> {
                Ok(UploadRow {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    uuid: row.get(2)?,
                    message_ids: row.get(3)?,
                    payload: row.get(4)?,
                    timestamp: row.get(5)?,
                    retry_count: row.get(6)?,
                })
            };
            match session_id {
                Some(session_id) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, session_id, uuid, message_ids, payload, timestamp, retry_count
                         FROM uploads WHERE session_id = ?1 ORDER BY id ASC",
                    )?;
                    let rows: Result<Vec<UploadRow>, _> =
                        stmt.query_map(params![session_id], read)?.collect();
                    rows
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT id, NULL, uuid, message_ids, payload, timestamp, retry_count
                         FROM {} ORDER BY id ASC",
                        pipeline.uploads_table()
                    ))?;
                    let rows: Result<Vec<UploadRow>, _> = stmt.query_map([], read)?.collect();
                    rows
                }
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Open uploads of a session, oldest first.
pub async fn uploads_in_session(db: &Database, session_id: i64) -> Result<Vec<Upload>, BurrowError> {
    let rows = select(db, Pipeline::Session, Some(session_id)).await?;
    Ok(decode_all(rows, |raw| {
        Ok(Upload {
            message_ids: decode_member_ids("uploads", &raw)?,
            id: Some(raw.id),
            session_id: raw.session_id.unwrap_or(session_id),
            uuid: raw.uuid,
            payload: raw.payload,
            timestamp: raw.timestamp,
            retry_count: raw.retry_count,
        })
    }))
}

/// Open standalone uploads, oldest first.
pub async fn standalone_uploads(db: &Database) -> Result<Vec<StandaloneUpload>, BurrowError> {
    let rows = select(db, Pipeline::Standalone, None).await?;
    Ok(decode_all(rows, |raw| {
        Ok(StandaloneUpload {
            message_ids: decode_member_ids("standalone_uploads", &raw)?,
            id: Some(raw.id),
            uuid: raw.uuid,
            payload: raw.payload,
            timestamp: raw.timestamp,
            retry_count: raw.retry_count,
        })
    }))
}

/// Delete an upload after confirmed transmission. Idempotent.
///
/// Flagged member messages stay uploaded and keep pointing at the upload.
pub async fn delete_upload(db: &Database, pipeline: Pipeline, id: i64) -> Result<(), BurrowError> {
    let removed = super::delete_by_id(db, pipeline.uploads_table(), id).await?;
    debug!(table = pipeline.uploads_table(), upload_id = id, removed, "upload deleted");
    Ok(())
}

/// Abandon an upload after a failed transmission.
///
/// Surviving members return to the unsent set and the upload row is removed.
/// When no member survives, as for an upload saved with
/// [`PersistenceOperation::Delete`], the payload is the only copy of the batch:
/// the row stays in place for a later retry pass and `0` is returned.
pub async fn release_upload(db: &Database, pipeline: Pipeline, id: i64) -> Result<usize, BurrowError> {
    let uploads = pipeline.uploads_table();
    let messages = pipeline.messages_table();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            let returned = tx.execute(
                &format!(
                    "UPDATE {messages} SET upload_status = ?1, upload_id = NULL
                     WHERE upload_id = ?2"
                ),
                params![UploadStatus::Batch.as_i64(), id],
            )?;
            if returned > 0 {
                tx.execute(&format!("DELETE FROM {uploads} WHERE id = ?1"), params![id])?;
            }
            tx.commit()?;
            Ok(returned)
        })
        .await
        .map_err(map_tr_err)
        .inspect(|returned| {
            if *returned == 0 {
                debug!(
                    table = uploads,
                    upload_id = id,
                    "no members to release, upload kept for retry"
                );
            }
        })
}

/// Count one more failed attempt; returns the new count, `None` if the upload is gone.
pub async fn record_upload_attempt(
    db: &Database,
    pipeline: Pipeline,
    id: i64,
) -> Result<Option<u32>, BurrowError> {
    let uploads = pipeline.uploads_table();
    db.connection()
        .call(move |conn| -> Result<Option<u32>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "UPDATE {uploads} SET retry_count = retry_count + 1 WHERE id = ?1
                     RETURNING retry_count"
                ),
                params![id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
