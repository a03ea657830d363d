// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audience segments with their membership history.

use std::collections::BTreeMap;
use std::str::FromStr;

use burrow_core::BurrowError;
use burrow_core::types::{MembershipAction, Segment, SegmentMembership};
use rusqlite::params;

use super::{decode_all, decode_error};
use crate::database::{Database, map_tr_err};

struct SegmentRow {
    segment_id: i64,
    uuid: String,
    name: String,
    endpoint_ids: String,
    memberships: Vec<(String, f64)>,
}

fn decode(raw: SegmentRow) -> Result<Segment, BurrowError> {
    let endpoint_ids: Vec<String> = serde_json::from_str(&raw.endpoint_ids)
        .map_err(|e| decode_error("segments", raw.segment_id, e))?;
    let memberships = raw
        .memberships
        .into_iter()
        .map(|(action, timestamp)| {
            MembershipAction::from_str(&action)
                .map(|action| SegmentMembership { action, timestamp })
                .map_err(|_| {
                    decode_error(
                        "segment_memberships",
                        raw.segment_id,
                        format!("unknown action `{action}`"),
                    )
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Segment {
        segment_id: raw.segment_id,
        uuid: raw.uuid,
        name: raw.name,
        endpoint_ids,
        memberships,
    })
}

/// Replace a segment and its memberships, keyed by `segment_id`.
pub async fn save_segment(db: &Database, segment: &Segment) -> Result<i64, BurrowError> {
    let segment = segment.clone();
    let endpoint_ids = serde_json::to_string(&segment.endpoint_ids).map_err(|e| {
        BurrowError::Internal(format!("cannot encode endpoint ids: {e}"))
    })?;
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM segment_memberships WHERE segment_id = ?1",
                params![segment.segment_id],
            )?;
            tx.execute(
                "INSERT INTO segments (segment_id, uuid, name, endpoint_ids)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(segment_id) DO UPDATE SET
                     uuid = excluded.uuid,
                     name = excluded.name,
                     endpoint_ids = excluded.endpoint_ids",
                params![segment.segment_id, segment.uuid, segment.name, endpoint_ids],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO segment_memberships (segment_id, action, timestamp)
                     VALUES (?1, ?2, ?3)",
                )?;
                for membership in &segment.memberships {
                    stmt.execute(params![
                        segment.segment_id,
                        membership.action.to_string(),
                        membership.timestamp
                    ])?;
                }
            }
            tx.commit()?;
            Ok(segment.segment_id)
        })
        .await
        .map_err(map_tr_err)
}

/// All segments ordered by id, memberships oldest first.
pub async fn fetch_segments(db: &Database) -> Result<Vec<Segment>, BurrowError> {
    let rows = db
        .connection()
        .call(|conn| -> Result<Vec<SegmentRow>, rusqlite::Error> {
            let mut segments: BTreeMap<i64, SegmentRow> = BTreeMap::new();
            {
                let mut stmt = conn.prepare(
                    "SELECT segment_id, uuid, name, endpoint_ids FROM segments",
                )?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    let segment_id: i64 = row.get(0)?;
                    segments.insert(
                        segment_id,
                        SegmentRow {
                            segment_id,
                            uuid: row.get(1)?,
                            name: row.get(2)?,
                            endpoint_ids: row.get(3)?,
                            memberships: Vec::new(),
                        },
                    );
                }
            }
            let mut stmt = conn.prepare(
                "SELECT segment_id, action, timestamp FROM segment_memberships
                 ORDER BY timestamp ASC, id ASC",
            )?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let segment_id: i64 = row.get(0)?;
                if let Some(segment) = segments.get_mut(&segment_id) {
                    segment.memberships.push((row.get(1)?, row.get(2)?));
                }
            }
            Ok(segments.into_values().collect())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(decode_all(rows, decode))
}

/// Remove every segment and membership.
pub async fn delete_segments(db: &Database) -> Result<(), BurrowError> {
    db.connection()
        .call(|conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM segment_memberships", [])?;
            tx.execute("DELETE FROM segments", [])?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}
