// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record types persisted by the engine.
//!
//! Every record is a plain owned value. Callers hand copies across the
//! serializer boundary; mutation only happens inside a storage operation.
//! Store-assigned ids are `None` until the record has been saved.

mod command;
mod consumer;
mod forward;
mod message;
mod notification;
mod session;
mod side_tables;
mod upload;

pub use command::{Command, CommandBuilder, HttpMethod, StandaloneCommand, parse_request_url};
pub use consumer::{ConsumerInfo, Cookie};
pub use forward::ForwardRecord;
pub use message::{Message, MessageType, StandaloneMessage, UploadStatus};
pub use notification::{NotificationMode, UserNotification};
pub use session::{Session, SessionStatus};
pub use side_tables::{Breadcrumb, MembershipAction, ProductBag, Segment, SegmentMembership};
pub use upload::{PersistenceOperation, StandaloneUpload, Upload};

/// Health status reported by storage health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Store is open and answering queries.
    Healthy,
    /// Store is reachable but not fully operational.
    Degraded(String),
    /// Store is not operational.
    Unhealthy(String),
}

/// Generate a fresh client-side UUID string.
pub(crate) fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}
