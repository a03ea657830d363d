// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::time::now_timestamp;

/// What happens to member messages once an upload has been created from them.
///
/// Has no default; the orchestrator chooses per request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum PersistenceOperation {
    /// Member messages are deleted; the upload payload is the only copy.
    Delete,
    /// Member messages are kept and marked as uploaded.
    Flag,
}

/// A batch of session messages prepared for transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upload {
    pub id: Option<i64>,
    pub session_id: i64,
    pub uuid: String,
    /// Member message ids in batch order. Fixed at creation.
    pub message_ids: Vec<i64>,
    /// Serialized batch body sent over the wire.
    pub payload: Vec<u8>,
    pub timestamp: f64,
    /// Number of failed transmission attempts recorded so far.
    pub retry_count: u32,
}

impl Upload {
    pub fn new(session_id: i64, payload: Vec<u8>) -> Self {
        Self {
            id: None,
            session_id,
            uuid: super::new_uuid(),
            message_ids: Vec::new(),
            payload,
            timestamp: now_timestamp(),
            retry_count: 0,
        }
    }
}

/// A batch of standalone messages, not tied to any session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandaloneUpload {
    pub id: Option<i64>,
    pub uuid: String,
    pub message_ids: Vec<i64>,
    pub payload: Vec<u8>,
    pub timestamp: f64,
    pub retry_count: u32,
}

impl StandaloneUpload {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            id: None,
            uuid: super::new_uuid(),
            message_ids: Vec::new(),
            payload,
            timestamp: now_timestamp(),
            retry_count: 0,
        }
    }
}
