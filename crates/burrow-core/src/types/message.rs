// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::time::now_timestamp;

/// Kind of recorded event, persisted as the SDK's short wire code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum MessageType {
    #[strum(serialize = "ss")]
    SessionStart,
    #[strum(serialize = "se")]
    SessionEnd,
    #[strum(serialize = "e")]
    Event,
    #[strum(serialize = "v")]
    ScreenView,
    #[strum(serialize = "x")]
    CrashReport,
    #[strum(serialize = "o")]
    OptOut,
    #[strum(serialize = "fr")]
    FirstRun,
    #[strum(serialize = "pre")]
    PreAttribution,
    #[strum(serialize = "pr")]
    PushRegistration,
    #[strum(serialize = "ast")]
    AppStateTransition,
    #[strum(serialize = "pm")]
    PushNotification,
    #[strum(serialize = "pi")]
    PushNotificationInteraction,
    #[strum(serialize = "npe")]
    NetworkPerformance,
    #[strum(serialize = "bc")]
    Breadcrumb,
    #[strum(serialize = "pro")]
    Profile,
    #[strum(serialize = "cm")]
    Commerce,
    #[strum(serialize = "uac")]
    UserAttributeChange,
    #[strum(serialize = "uic")]
    UserIdentityChange,
}

/// Upload eligibility of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadStatus {
    /// Not yet sent; eligible for the next batch.
    Batch,
    /// Packed into an upload and kept for inspection.
    Uploaded,
}

impl UploadStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Batch => 0,
            Self::Uploaded => 1,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Batch),
            1 => Some(Self::Uploaded),
            _ => None,
        }
    }
}

/// One recorded telemetry event inside a session.
///
/// Immutable once written except for `upload_status` and `upload_id`,
/// which only the batch lifecycle operations change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Option<i64>,
    /// Owning session. Weak reference: the session may already be gone.
    pub session_id: i64,
    pub message_type: MessageType,
    pub uuid: String,
    pub timestamp: f64,
    /// Serialized event body, stored and returned byte-for-byte.
    pub payload: Vec<u8>,
    pub upload_status: UploadStatus,
    /// Upload currently holding this message, if any.
    pub upload_id: Option<i64>,
}

impl Message {
    pub fn new(session_id: i64, message_type: MessageType, payload: Vec<u8>) -> Self {
        Self {
            id: None,
            session_id,
            message_type,
            uuid: super::new_uuid(),
            timestamp: now_timestamp(),
            payload,
            upload_status: UploadStatus::Batch,
            upload_id: None,
        }
    }

    /// Override the event time (e.g. when replaying buffered events).
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// An event captured before any session id was known (pre-session or crash time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandaloneMessage {
    pub id: Option<i64>,
    pub message_type: MessageType,
    pub uuid: String,
    pub timestamp: f64,
    pub payload: Vec<u8>,
    pub upload_status: UploadStatus,
    pub upload_id: Option<i64>,
}

impl StandaloneMessage {
    pub fn new(message_type: MessageType, payload: Vec<u8>) -> Self {
        Self {
            id: None,
            message_type,
            uuid: super::new_uuid(),
            timestamp: now_timestamp(),
            payload,
            upload_status: UploadStatus::Batch,
            upload_id: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn message_type_uses_wire_codes() {
        assert_eq!(MessageType::SessionEnd.to_string(), "se");
        assert_eq!(MessageType::NetworkPerformance.to_string(), "npe");
        assert_eq!(MessageType::from_str("bc").unwrap(), MessageType::Breadcrumb);
        assert!(MessageType::from_str("nope").is_err());
    }

    #[test]
    fn upload_status_integer_mapping() {
        assert_eq!(UploadStatus::from_i64(0), Some(UploadStatus::Batch));
        assert_eq!(UploadStatus::from_i64(UploadStatus::Uploaded.as_i64()), Some(UploadStatus::Uploaded));
        assert_eq!(UploadStatus::from_i64(7), None);
    }

    #[test]
    fn new_message_is_unclaimed_batch() {
        let message = Message::new(9, MessageType::Event, b"{}".to_vec()).with_timestamp(42.0);
        assert_eq!(message.session_id, 9);
        assert_eq!(message.timestamp, 42.0);
        assert_eq!(message.upload_status, UploadStatus::Batch);
        assert!(message.upload_id.is_none());
    }
}
