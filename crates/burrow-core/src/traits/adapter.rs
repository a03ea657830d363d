// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity, health and shutdown shared by every backend.

use async_trait::async_trait;

use crate::error::BurrowError;
use crate::types::HealthStatus;

#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Human-readable name of this backend instance.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    /// Check the backend and report its current status.
    async fn health_check(&self) -> Result<HealthStatus, BurrowError>;

    /// Release held resources. Safe to call more than once.
    async fn shutdown(&self) -> Result<(), BurrowError>;
}
