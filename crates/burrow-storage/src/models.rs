// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record types stored by this crate.
//!
//! The canonical types live in `burrow-core::types`; they are re-exported
//! here so callers of the storage crate need only one import path.

pub use burrow_core::types::{
    Breadcrumb, Command, CommandBuilder, ConsumerInfo, Cookie, ForwardRecord, HttpMethod,
    MembershipAction, Message, MessageType, NotificationMode, PersistenceOperation, ProductBag,
    Segment, SegmentMembership, Session, SessionStatus, StandaloneCommand, StandaloneMessage,
    StandaloneUpload, Upload, UploadStatus, UserNotification,
};
