// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::time::now_timestamp;

/// Lifecycle state of a session row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Session is in progress (or was interrupted by a crash).
    Active,
    /// Session was explicitly ended; aggregate fields are final.
    Archived,
}

/// One continuous period of application use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Store-assigned id, `None` until first saved.
    pub id: Option<i64>,
    /// Client-generated identifier, stable across process restarts.
    pub uuid: String,
    pub start_time: f64,
    /// Last activity; final once the session is archived.
    pub end_time: f64,
    /// Accumulated seconds spent in the background.
    pub background_time: f64,
    /// Session-scoped attributes accumulated by the SDK.
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub is_background: bool,
    pub status: SessionStatus,
    /// Monotonic per-install session counter.
    pub session_number: i64,
}

impl Session {
    /// Start a new session at the current time.
    pub fn new(session_number: i64) -> Self {
        let now = now_timestamp();
        Self {
            id: None,
            uuid: super::new_uuid(),
            start_time: now,
            end_time: now,
            background_time: 0.0,
            attributes: BTreeMap::new(),
            is_background: false,
            status: SessionStatus::Active,
            session_number,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.status == SessionStatus::Archived
    }

    /// Total length of the session in seconds, excluding background time.
    pub fn foreground_length(&self) -> f64 {
        (self.end_time - self.start_time - self.background_time).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_active_and_unsaved() {
        let session = Session::new(3);
        assert!(session.id.is_none());
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.session_number, 3);
        assert_eq!(session.start_time, session.end_time);
        assert!(!session.uuid.is_empty());
    }

    #[test]
    fn foreground_length_never_negative() {
        let mut session = Session::new(1);
        session.start_time = 100.0;
        session.end_time = 160.0;
        session.background_time = 20.0;
        assert_eq!(session.foreground_length(), 40.0);

        session.background_time = 500.0;
        assert_eq!(session.foreground_length(), 0.0);
    }

    #[test]
    fn status_round_trips_through_strings() {
        use std::str::FromStr;
        assert_eq!(SessionStatus::Archived.to_string(), "archived");
        assert_eq!(SessionStatus::from_str("active").unwrap(), SessionStatus::Active);
    }
}
