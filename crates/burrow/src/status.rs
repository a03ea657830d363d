// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `burrow status` command implementation.
//!
//! Reports whether the store is open, its schema version and per-table row
//! counts. A store that cannot be opened is reported, not treated as an error.

use std::io::IsTerminal;

use burrow_core::BurrowError;
use burrow_storage::PersistenceController;
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub open: bool,
    pub database_path: String,
    pub schema_version: Option<i64>,
    pub tables: Vec<TableCount>,
}

#[derive(Debug, Serialize)]
pub struct TableCount {
    pub table: &'static str,
    pub rows: usize,
}

pub async fn collect_status(controller: &PersistenceController) -> Result<StatusReport, BurrowError> {
    let open = controller.is_open().await;
    let (schema_version, tables) = if open {
        let counts = controller.table_counts().await?;
        (
            controller.schema_version().await?,
            counts
                .into_iter()
                .map(|(table, rows)| TableCount { table, rows })
                .collect(),
        )
    } else {
        (None, Vec::new())
    };
    Ok(StatusReport {
        open,
        database_path: controller.database_path().to_string(),
        schema_version,
        tables,
    })
}

/// Run the `burrow status` command.
pub async fn run_status(
    controller: &PersistenceController,
    json: bool,
    plain: bool,
) -> Result<(), BurrowError> {
    let report = collect_status(controller).await?;
    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| BurrowError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&report, use_color);
    }
    Ok(())
}

fn print_status(report: &StatusReport, use_color: bool) {
    let state = match (report.open, use_color) {
        (true, true) => {
            use colored::Colorize;
            "open".green().to_string()
        }
        (false, true) => {
            use colored::Colorize;
            "unavailable".red().to_string()
        }
        (true, false) => "open".to_string(),
        (false, false) => "unavailable".to_string(),
    };

    println!();
    println!("  burrow status");
    println!("  {}", "-".repeat(40));
    println!("    {:<22} {state}", "store");
    println!("    {:<22} {}", "path", report.database_path);
    if let Some(version) = report.schema_version {
        println!("    {:<22} {version}", "schema version");
    }
    for count in &report.tables {
        println!("    {:<22} {}", count.table, count.rows);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_config::model::{RetentionConfig, StorageConfig};
    use burrow_core::types::Session;

    fn controller_at(path: &str) -> PersistenceController {
        PersistenceController::new(
            StorageConfig {
                database_path: path.to_string(),
                ..StorageConfig::default()
            },
            RetentionConfig::default(),
        )
    }

    #[tokio::test]
    async fn open_store_reports_counts() {
        let controller = controller_at(":memory:");
        assert!(controller.open().await);
        controller.save_session(&Session::new(1)).await.unwrap();

        let report = collect_status(&controller).await.unwrap();
        assert!(report.open);
        assert_eq!(report.schema_version, Some(2));
        let sessions = report.tables.iter().find(|t| t.table == "sessions").unwrap();
        assert_eq!(sessions.rows, 1);
        controller.close().await.unwrap();
    }

    #[tokio::test]
    async fn closed_store_reports_unavailable() {
        let controller = controller_at(":memory:");
        let report = collect_status(&controller).await.unwrap();
        assert!(!report.open);
        assert!(report.tables.is_empty());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["open"], false);
        assert_eq!(json["database_path"], ":memory:");
    }
}
