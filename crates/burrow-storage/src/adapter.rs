// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use burrow_config::model::StorageConfig;
use burrow_core::{BurrowError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::database::{Database, map_tr_err};

/// SQLite-backed store with an explicit open/closed lifecycle.
///
/// The handle slot is guarded by an async `RwLock`: opening and closing take
/// the write half, so they never interleave with operations that are being
/// submitted under the read half. The store may be reopened after a close.
pub struct SqliteStorage {
    config: StorageConfig,
    db: RwLock<Option<Database>>,
}

impl SqliteStorage {
    /// Create a closed store. Nothing touches the disk until [`StorageAdapter::open`].
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// A handle to the open database.
    pub async fn database(&self) -> Result<Database, BurrowError> {
        self.db
            .read()
            .await
            .clone()
            .ok_or_else(|| BurrowError::StoreUnavailable("store is not open".into()))
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, BurrowError> {
        let Ok(db) = self.database().await else {
            return Ok(HealthStatus::Unhealthy("store is not open".into()));
        };
        let ping = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT 1", [], |row| row.get(0))
            })
            .await
            .map_err(map_tr_err);
        Ok(match ping {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Degraded(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), BurrowError> {
        self.close().await
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn open(&self) -> Result<(), BurrowError> {
        let mut slot = self.db.write().await;
        if slot.is_some() {
            debug!("store already open");
            return Ok(());
        }
        let db = Database::open_with(&self.config).await?;
        *slot = Some(db);
        info!(path = %self.config.database_path, "SQLite storage opened");
        Ok(())
    }

    async fn close(&self) -> Result<(), BurrowError> {
        let mut slot = self.db.write().await;
        match slot.take() {
            Some(db) => db.close().await,
            None => Ok(()),
        }
    }

    async fn is_open(&self) -> bool {
        self.db.read().await.is_some()
    }
}
