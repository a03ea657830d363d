// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

use crate::time::now_timestamp;

/// Audit entry of data relayed to a third-party integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardRecord {
    pub id: Option<i64>,
    /// Identifier of the receiving integration.
    pub integration_id: i64,
    pub payload: Vec<u8>,
    pub timestamp: f64,
}

impl ForwardRecord {
    pub fn new(integration_id: i64, payload: Vec<u8>) -> Self {
        Self {
            id: None,
            integration_id,
            payload,
            timestamp: now_timestamp(),
        }
    }
}
