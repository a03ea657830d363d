// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auxiliary tables with no lifecycle beyond explicit deletes and clears.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::{Message, Session};
use crate::time::now_timestamp;

/// A named, serialized collection of products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductBag {
    pub id: Option<i64>,
    /// Unique bag name; saving an existing name replaces its contents.
    pub name: String,
    pub timestamp: f64,
    pub products: Vec<u8>,
}

impl ProductBag {
    pub fn new(name: impl Into<String>, products: Vec<u8>) -> Self {
        Self {
            id: None,
            name: name.into(),
            timestamp: now_timestamp(),
            products,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum MembershipAction {
    Add,
    Drop,
}

/// One membership change of an audience segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMembership {
    pub action: MembershipAction,
    pub timestamp: f64,
}

/// An audience segment assigned by the server, keyed by its external id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: i64,
    pub uuid: String,
    pub name: String,
    pub endpoint_ids: Vec<String>,
    pub memberships: Vec<SegmentMembership>,
}

impl Segment {
    pub fn new(segment_id: i64, name: impl Into<String>) -> Self {
        Self {
            segment_id,
            uuid: super::new_uuid(),
            name: name.into(),
            endpoint_ids: Vec::new(),
            memberships: Vec::new(),
        }
    }

    /// Whether the latest membership change adds the subject to the segment.
    pub fn is_member(&self) -> bool {
        self.memberships
            .iter()
            .max_by(|a, b| a.timestamp.total_cmp(&b.timestamp))
            .is_some_and(|m| m.action == MembershipAction::Add)
    }
}

/// A breadcrumb left by the app, kept for crash context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub id: Option<i64>,
    pub session_uuid: String,
    pub message_uuid: String,
    pub payload: Vec<u8>,
    pub timestamp: f64,
    pub session_number: i64,
}

impl Breadcrumb {
    /// Derive a breadcrumb from a breadcrumb message and its session.
    pub fn from_message(message: &Message, session: &Session) -> Self {
        Self {
            id: None,
            session_uuid: session.uuid.clone(),
            message_uuid: message.uuid.clone(),
            payload: message.payload.clone(),
            timestamp: message.timestamp,
            session_number: session.session_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageType;

    #[test]
    fn latest_membership_decides() {
        let mut segment = Segment::new(10, "buyers");
        assert!(!segment.is_member());

        segment.memberships.push(SegmentMembership {
            action: MembershipAction::Add,
            timestamp: 10.0,
        });
        segment.memberships.push(SegmentMembership {
            action: MembershipAction::Drop,
            timestamp: 20.0,
        });
        assert!(!segment.is_member());

        segment.memberships.push(SegmentMembership {
            action: MembershipAction::Add,
            timestamp: 15.0,
        });
        assert!(!segment.is_member());
    }

    #[test]
    fn breadcrumb_copies_message_and_session_identity() {
        let session = Session::new(4);
        let message = Message::new(1, MessageType::Breadcrumb, b"tapped".to_vec());
        let crumb = Breadcrumb::from_message(&message, &session);
        assert_eq!(crumb.session_uuid, session.uuid);
        assert_eq!(crumb.message_uuid, message.uuid);
        assert_eq!(crumb.payload, b"tapped".to_vec());
        assert_eq!(crumb.session_number, 4);
    }
}
