// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness around a temp-directory store.
//!
//! The temp directory lives as long as the harness, so a test can close and
//! reopen the controller against the same file.

use std::path::PathBuf;

use burrow_config::model::{RetentionConfig, StorageConfig};
use burrow_core::BurrowError;
use burrow_storage::PersistenceController;
use tracing::debug;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    retention: RetentionConfig,
    wal_mode: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            retention: RetentionConfig::default(),
            wal_mode: true,
        }
    }

    pub fn with_retention(mut self, retention: RetentionConfig) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_max_breadcrumbs(mut self, max: usize) -> Self {
        self.retention.max_breadcrumbs = max;
        self
    }

    /// Use rollback journaling instead of WAL.
    pub fn without_wal(mut self) -> Self {
        self.wal_mode = false;
        self
    }

    /// Create the temp database and open a controller over it.
    pub async fn build(self) -> Result<TestHarness, BurrowError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| BurrowError::Storage {
            source: Box::new(e),
        })?;
        let db_path = temp_dir.path().join("test.db");
        let storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: self.wal_mode,
            ..StorageConfig::default()
        };

        let controller = PersistenceController::new(storage, self.retention);
        if !controller.open().await {
            return Err(BurrowError::StoreUnavailable(format!(
                "test store at {} did not open",
                db_path.display()
            )));
        }
        debug!(path = %db_path.display(), "test harness ready");

        Ok(TestHarness {
            controller,
            db_path,
            _temp_dir: temp_dir,
        })
    }
}

/// An open controller over a private on-disk database.
pub struct TestHarness {
    controller: PersistenceController,
    db_path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings.
    pub async fn new() -> Result<Self, BurrowError> {
        Self::builder().build().await
    }

    pub fn controller(&self) -> &PersistenceController {
        &self.controller
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Close and reopen the controller on the same file.
    pub async fn reopen(&self) -> Result<(), BurrowError> {
        self.controller.close().await?;
        if self.controller.open().await {
            Ok(())
        } else {
            Err(BurrowError::StoreUnavailable("reopen failed".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::types::Session;

    #[tokio::test]
    async fn harness_opens_a_file_backed_store() {
        let harness = TestHarness::new().await.unwrap();
        assert!(harness.controller().is_open().await);
        assert!(harness.db_path().exists());
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let harness = TestHarness::builder().without_wal().build().await.unwrap();
        harness
            .controller()
            .save_session(&Session::new(3))
            .await
            .unwrap();
        harness.reopen().await.unwrap();
        assert_eq!(harness.controller().fetch_sessions().await.len(), 1);
        harness.controller().close().await.unwrap();
    }
}
