// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection management: PRAGMA setup, migrations and close.
//!
//! A [`Database`] wraps exactly one `tokio_rusqlite::Connection`. Every query
//! module reaches SQLite through [`Database::connection`], so all work runs on
//! that connection's single background thread in submission order. This is
//! the engine's only writer; do not open a second connection to the same file.

use std::path::Path;
use std::time::Duration;

use burrow_config::model::StorageConfig;
use burrow_core::BurrowError;
use tracing::{debug, info};

use crate::migrations;

const IN_MEMORY: &str = ":memory:";

/// Handle to the open store.
///
/// Cloning shares the same background thread and queue.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
}

impl Database {
    /// Open the database at `path` with default storage settings.
    pub async fn open(path: &str) -> Result<Self, BurrowError> {
        let config = StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        };
        Self::open_with(&config).await
    }

    /// Open a private in-memory database.
    pub async fn open_in_memory() -> Result<Self, BurrowError> {
        Self::open(IN_MEMORY).await
    }

    /// Open using explicit storage settings, creating parent directories and
    /// applying pending migrations.
    pub async fn open_with(config: &StorageConfig) -> Result<Self, BurrowError> {
        let path = config.database_path.clone();

        let conn = if path == IN_MEMORY {
            tokio_rusqlite::Connection::open_in_memory().await
        } else {
            if let Some(parent) = Path::new(&path).parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).map_err(|e| {
                    BurrowError::StoreUnavailable(format!(
                        "cannot create {}: {e}",
                        parent.display()
                    ))
                })?;
            }
            tokio_rusqlite::Connection::open(&path).await
        }
        .map_err(|e| BurrowError::StoreUnavailable(format!("cannot open {path}: {e}")))?;

        let wal_mode = config.wal_mode;
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        conn.call(move |conn| -> Result<(), BurrowError> {
            configure(conn, wal_mode, busy_timeout).map_err(|e| BurrowError::Storage {
                source: Box::new(e),
            })?;
            migrations::run_migrations(conn)
        })
        .await
        .map_err(map_call_err)?;

        info!(path = %path, wal_mode, "database opened");
        Ok(Self { conn, path })
    }

    /// The serialized connection every query goes through.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Checkpoint the WAL and close the connection.
    ///
    /// Operations queued behind the close fail with `StoreUnavailable`.
    pub async fn close(self) -> Result<(), BurrowError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)?;
        debug!(path = %self.path, "WAL checkpoint complete");

        self.conn
            .close()
            .await
            .map_err(|e| BurrowError::StoreUnavailable(format!("close failed: {e}")))?;
        info!(path = %self.path, "database closed");
        Ok(())
    }
}

fn configure(
    conn: &mut rusqlite::Connection,
    wal_mode: bool,
    busy_timeout: Duration,
) -> Result<(), rusqlite::Error> {
    conn.busy_timeout(busy_timeout)?;
    let mode = if wal_mode { "WAL" } else { "DELETE" };
    let applied: String =
        conn.pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))?;
    debug!(requested = mode, applied = %applied, "journal mode set");
    conn.execute_batch(
        "PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;",
    )?;
    Ok(())
}

/// Map a failed `call` whose closure returned a `rusqlite::Error`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> BurrowError {
    match e {
        tokio_rusqlite::Error::Error(inner) => BurrowError::Storage {
            source: Box::new(inner),
        },
        other => BurrowError::StoreUnavailable(other.to_string()),
    }
}

/// Map a failed `call` whose closure already produced a `BurrowError`.
pub(crate) fn map_call_err(e: tokio_rusqlite::Error<BurrowError>) -> BurrowError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => BurrowError::StoreUnavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/deeper/burrow.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        assert!(db_path.exists());
        assert_eq!(db.path(), db_path.to_str().unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn wal_mode_is_applied() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("wal.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let mode = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_keeps_schema_version() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");
        let path = db_path.to_str().unwrap();

        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();
        let version = db
            .connection()
            .call(|conn| -> Result<Option<i64>, rusqlite::Error> {
                migrations::current_version(conn)
            })
            .await
            .unwrap();
        assert_eq!(version, Some(2));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn calls_after_close_report_unavailable() {
        let db = Database::open_in_memory().await.unwrap();
        let handle = db.clone();
        db.close().await.unwrap();

        let err = handle
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
            .map_err(map_tr_err)
            .unwrap_err();
        assert!(matches!(err, BurrowError::StoreUnavailable(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unopenable_path_is_reported_not_fatal() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let result = Database::open(dir.path().to_str().unwrap()).await;
        assert!(result.is_err());
    }
}
