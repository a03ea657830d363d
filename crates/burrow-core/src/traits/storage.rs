// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Open/close lifecycle of a durable store.

use async_trait::async_trait;

use crate::error::BurrowError;
use crate::traits::adapter::PluginAdapter;

/// A durable store with an explicit open/close lifecycle.
///
/// `open` and `close` are exclusive with respect to every other operation
/// on the same instance. Both are idempotent.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Open the store and apply pending schema migrations.
    ///
    /// Opening an already-open store is a no-op. A failure leaves the store
    /// closed and is returned, never panicked on.
    async fn open(&self) -> Result<(), BurrowError>;

    /// Checkpoint and release the store. Closing a closed store is a no-op.
    async fn close(&self) -> Result<(), BurrowError>;

    async fn is_open(&self) -> bool;
}
