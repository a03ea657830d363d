// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivered user notifications and campaign history.

use std::str::FromStr;

use burrow_core::BurrowError;
use burrow_core::types::{NotificationMode, UserNotification};
use rusqlite::params;
use rusqlite::types::Value;

use super::{decode_all, decode_error};
use crate::database::{Database, map_tr_err};

const TABLE: &str = "user_notifications";
const COLUMNS: &str = "id, uuid, campaign_id, content_id, payload, action_identifier, mode,
                       displayed, receipt_time, expiration";

struct NotificationRow {
    id: i64,
    uuid: String,
    campaign_id: Option<i64>,
    content_id: Option<i64>,
    payload: Vec<u8>,
    action_identifier: Option<String>,
    mode: String,
    displayed: bool,
    receipt_time: f64,
    expiration: f64,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        uuid: row.get(1)?,
        campaign_id: row.get(2)?,
        content_id: row.get(3)?,
        payload: row.get(4)?,
        action_identifier: row.get(5)?,
        mode: row.get(6)?,
        displayed: row.get(7)?,
        receipt_time: row.get(8)?,
        expiration: row.get(9)?,
    })
}

fn decode(raw: NotificationRow) -> Result<UserNotification, BurrowError> {
    let mode = NotificationMode::from_str(&raw.mode)
        .map_err(|_| decode_error(TABLE, raw.id, format!("unknown mode `{}`", raw.mode)))?;
    Ok(UserNotification {
        id: Some(raw.id),
        uuid: raw.uuid,
        campaign_id: raw.campaign_id,
        content_id: raw.content_id,
        payload: raw.payload,
        action_identifier: raw.action_identifier,
        mode,
        displayed: raw.displayed,
        receipt_time: raw.receipt_time,
        expiration: raw.expiration,
    })
}

async fn select(
    db: &Database,
    filter: &'static str,
    args: Vec<Value>,
) -> Result<Vec<UserNotification>, BurrowError> {
    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<NotificationRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM user_notifications {filter}"
            ))?;
            let rows: Result<Vec<NotificationRow>, _> = stmt
                .query_map(rusqlite::params_from_iter(args), read_row)?
                .collect();
            rows
        })
        .await
        .map_err(map_tr_err)?;
    Ok(decode_all(rows, decode))
}

/// Insert a notification; returns its id.
pub async fn save_notification(
    db: &Database,
    notification: &UserNotification,
) -> Result<i64, BurrowError> {
    let n = notification.clone();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO user_notifications (id, uuid, campaign_id, content_id, payload,
                     action_identifier, mode, displayed, receipt_time, expiration)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                     uuid = excluded.uuid,
                     campaign_id = excluded.campaign_id,
                     content_id = excluded.content_id,
                     payload = excluded.payload,
                     action_identifier = excluded.action_identifier,
                     mode = excluded.mode,
                     displayed = excluded.displayed,
                     receipt_time = excluded.receipt_time,
                     expiration = excluded.expiration",
                params![
                    n.id,
                    n.uuid,
                    n.campaign_id,
                    n.content_id,
                    n.payload,
                    n.action_identifier,
                    n.mode.to_string(),
                    n.displayed,
                    n.receipt_time,
                    n.expiration,
                ],
            )?;
            Ok(n.id.unwrap_or_else(|| conn.last_insert_rowid()))
        })
        .await
        .map_err(map_tr_err)
}

/// Replace a stored notification by id. Returns `false` when nothing matched.
pub async fn update_notification(
    db: &Database,
    notification: &UserNotification,
) -> Result<bool, BurrowError> {
    let Some(id) = notification.id else {
        return Ok(false);
    };
    let n = notification.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE user_notifications SET uuid = ?2, campaign_id = ?3, content_id = ?4,
                     payload = ?5, action_identifier = ?6, mode = ?7, displayed = ?8,
                     receipt_time = ?9, expiration = ?10
                 WHERE id = ?1",
                params![
                    id,
                    n.uuid,
                    n.campaign_id,
                    n.content_id,
                    n.payload,
                    n.action_identifier,
                    n.mode.to_string(),
                    n.displayed,
                    n.receipt_time,
                    n.expiration,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_notification(db: &Database, id: i64) -> Result<(), BurrowError> {
    super::delete_by_id(db, TABLE, id).await.map(|_| ())
}

pub async fn notifications(db: &Database) -> Result<Vec<UserNotification>, BurrowError> {
    select(db, "ORDER BY receipt_time ASC, id ASC", Vec::new()).await
}

/// Displayed notifications of one mode, optionally only those received at or
/// after `since`. Newest first.
pub async fn displayed_notifications(
    db: &Database,
    mode: NotificationMode,
    since: Option<f64>,
) -> Result<Vec<UserNotification>, BurrowError> {
    let since = since.unwrap_or(f64::MIN);
    select(
        db,
        "WHERE displayed = 1 AND mode = ?1 AND receipt_time >= ?2
         ORDER BY receipt_time DESC, id DESC",
        vec![Value::Text(mode.to_string()), Value::Real(since)],
    )
    .await
}

/// For each campaign, the most recent displayed notification received at or
/// after `since` that has not expired by `now`.
pub async fn campaign_history(
    db: &Database,
    since: f64,
    now: f64,
) -> Result<Vec<UserNotification>, BurrowError> {
    select(
        db,
        "AS n WHERE n.displayed = 1 AND n.campaign_id IS NOT NULL
             AND n.receipt_time >= ?1 AND n.expiration >= ?2
             AND n.id = (
                 SELECT m.id FROM user_notifications AS m
                 WHERE m.campaign_id = n.campaign_id AND m.displayed = 1
                   AND m.receipt_time >= ?1 AND m.expiration >= ?2
                 ORDER BY m.receipt_time DESC, m.id DESC LIMIT 1)
         ORDER BY n.campaign_id ASC",
        vec![Value::Real(since), Value::Real(now)],
    )
    .await
}

/// Delete notifications whose expiration is before `now`.
pub async fn delete_expired_notifications(db: &Database, now: f64) -> Result<usize, BurrowError> {
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM user_notifications WHERE expiration < ?1",
                params![now],
            )
        })
        .await
        .map_err(map_tr_err)
}
