// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::time::now_timestamp;

/// Delivery channel of a user notification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum NotificationMode {
    Local,
    Remote,
}

/// A delivered local or remote notification.
///
/// The payload is opaque to the engine; only the correlation and timing
/// fields are queried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserNotification {
    pub id: Option<i64>,
    pub uuid: String,
    pub campaign_id: Option<i64>,
    pub content_id: Option<i64>,
    pub payload: Vec<u8>,
    pub action_identifier: Option<String>,
    pub mode: NotificationMode,
    pub displayed: bool,
    pub receipt_time: f64,
    /// After this time the record is evicted by the expiry sweep.
    pub expiration: f64,
}

impl UserNotification {
    /// A notification received now, expiring `ttl_secs` later.
    pub fn new(mode: NotificationMode, payload: Vec<u8>, ttl_secs: f64) -> Self {
        let now = now_timestamp();
        Self {
            id: None,
            uuid: super::new_uuid(),
            campaign_id: None,
            content_id: None,
            payload,
            action_identifier: None,
            mode,
            displayed: false,
            receipt_time: now,
            expiration: now + ttl_secs,
        }
    }

    pub fn with_campaign(mut self, campaign_id: i64, content_id: i64) -> Self {
        self.campaign_id = Some(campaign_id);
        self.content_id = Some(content_id);
        self
    }

    pub fn is_expired_at(&self, timestamp: f64) -> bool {
        self.expiration < timestamp
    }
}
