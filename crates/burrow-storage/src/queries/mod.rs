// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table group.
//!
//! Each function is a single closure on the serialized connection. Rows are
//! read as raw column values inside the closure and decoded afterwards, so a
//! row that fails to decode is skipped without aborting the whole fetch.

pub mod breadcrumbs;
pub mod commands;
pub mod consumer_info;
pub mod forward_records;
pub mod maintenance;
pub mod messages;
pub mod notifications;
pub mod product_bags;
pub mod segments;
pub mod sessions;
pub mod standalone;
pub mod uploads;

use std::str::FromStr;

use burrow_core::BurrowError;
use burrow_core::types::{MessageType, UploadStatus};
use rusqlite::params;
use tracing::warn;

use crate::database::{Database, map_tr_err};

/// Decode raw rows, logging and dropping the ones that fail.
pub(crate) fn decode_all<R, T>(
    rows: Vec<R>,
    decode: impl Fn(R) -> Result<T, BurrowError>,
) -> Vec<T> {
    rows.into_iter()
        .filter_map(|raw| match decode(raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "skipping undecodable row");
                None
            }
        })
        .collect()
}

pub(crate) fn decode_error(table: &'static str, id: i64, reason: impl ToString) -> BurrowError {
    BurrowError::Serialization {
        table,
        id,
        reason: reason.to_string(),
    }
}

pub(crate) fn parse_message_type(
    table: &'static str,
    id: i64,
    code: &str,
) -> Result<MessageType, BurrowError> {
    MessageType::from_str(code)
        .map_err(|_| decode_error(table, id, format!("unknown message type `{code}`")))
}

pub(crate) fn parse_upload_status(
    table: &'static str,
    id: i64,
    raw: i64,
) -> Result<UploadStatus, BurrowError> {
    UploadStatus::from_i64(raw)
        .ok_or_else(|| decode_error(table, id, format!("unknown upload status {raw}")))
}

/// Delete one row by id. Deleting an absent id is not an error.
pub(crate) async fn delete_by_id(
    db: &Database,
    table: &'static str,
    id: i64,
) -> Result<bool, BurrowError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let deleted = conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every listed id in one transaction, or none of them.
///
/// Any failure rolls the whole list back and is reported as
/// [`BurrowError::PartialBatchFailure`]. Ids already absent count as done.
pub(crate) async fn delete_ids_atomically(
    db: &Database,
    table: &'static str,
    ids: &[i64],
) -> Result<usize, BurrowError> {
    let ids = ids.to_vec();
    let requested = ids.len();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            let mut deleted = 0;
            {
                let mut stmt = tx.prepare(&format!("DELETE FROM {table} WHERE id = ?1"))?;
                for id in &ids {
                    deleted += stmt.execute(params![id])?;
                }
            }
            tx.commit()?;
            Ok(deleted)
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(inner) => BurrowError::PartialBatchFailure {
                requested,
                reason: inner.to_string(),
            },
            other => BurrowError::StoreUnavailable(other.to_string()),
        })
}

pub(crate) async fn count_where(
    db: &Database,
    sql: &'static str,
    param: Option<i64>,
) -> Result<usize, BurrowError> {
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            match param {
                Some(value) => conn.query_row(sql, params![value], |row| row.get(0)),
                None => conn.query_row(sql, [], |row| row.get(0)),
            }
        })
        .await
        .map_err(map_tr_err)
        .map(|count| usize::try_from(count).unwrap_or_default())
}
