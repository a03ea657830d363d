// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record fixtures with deterministic timestamps.

use burrow_core::BurrowError;
use burrow_core::types::{Message, MessageType, Session, StandaloneMessage};
use burrow_storage::PersistenceController;

/// A session starting and ending at `start`.
pub fn session_at(session_number: i64, start: f64) -> Session {
    let mut session = Session::new(session_number);
    session.start_time = start;
    session.end_time = start;
    session
}

pub fn event_at(session_id: i64, timestamp: f64) -> Message {
    Message::new(session_id, MessageType::Event, b"{\"n\":\"tap\"}".to_vec())
        .with_timestamp(timestamp)
}

pub fn standalone_event_at(timestamp: f64) -> StandaloneMessage {
    StandaloneMessage::new(MessageType::Event, b"{\"n\":\"boot\"}".to_vec())
        .with_timestamp(timestamp)
}

/// Save a session plus `count` events stamped `1.0, 2.0, ...`.
///
/// Returns the saved session and the message ids in insertion order.
pub async fn seed_session(
    controller: &PersistenceController,
    session_number: i64,
    count: usize,
) -> Result<(Session, Vec<i64>), BurrowError> {
    let mut session = session_at(session_number, 0.0);
    let session_id = controller.save_session(&session).await?;
    session.id = Some(session_id);

    let mut ids = Vec::with_capacity(count);
    for n in 1..=count {
        ids.push(controller.save_message(&event_at(session_id, n as f64)).await?);
    }
    Ok((session, ids))
}

/// Save `count` standalone events stamped `1.0, 2.0, ...`.
pub async fn seed_standalone(
    controller: &PersistenceController,
    count: usize,
) -> Result<Vec<i64>, BurrowError> {
    let mut ids = Vec::with_capacity(count);
    for n in 1..=count {
        ids.push(
            controller
                .save_standalone_message(&standalone_event_at(n as f64))
                .await?,
        );
    }
    Ok(ids)
}
