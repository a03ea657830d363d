// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `burrow doctor` command implementation.
//!
//! Runs diagnostic checks against the configured store.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use burrow_core::{BurrowError, HealthStatus};
use burrow_storage::PersistenceController;
use burrow_storage::migrations;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

fn result(name: &str, status: CheckStatus, message: String, started: Instant) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        status,
        message,
        duration: started.elapsed(),
    }
}

/// Run every check. Later checks are skipped when the store is not open.
pub async fn run_checks(controller: &PersistenceController) -> Vec<CheckResult> {
    let mut results = vec![check_health(controller).await];
    if !controller.is_open().await {
        return results;
    }
    results.push(check_schema(controller).await);
    results.push(check_integrity(controller).await);
    results
}

async fn check_health(controller: &PersistenceController) -> CheckResult {
    let started = Instant::now();
    match controller.health_check().await {
        HealthStatus::Healthy => result(
            "store",
            CheckStatus::Pass,
            format!("open at {}", controller.database_path()),
            started,
        ),
        HealthStatus::Degraded(reason) => result("store", CheckStatus::Warn, reason, started),
        HealthStatus::Unhealthy(reason) => result(
            "store",
            CheckStatus::Fail,
            format!("{reason} ({})", controller.database_path()),
            started,
        ),
    }
}

async fn check_schema(controller: &PersistenceController) -> CheckResult {
    let started = Instant::now();
    let latest = migrations::latest_version();
    match controller.schema_version().await {
        Ok(Some(version)) if version == latest => result(
            "schema",
            CheckStatus::Pass,
            format!("version {version}"),
            started,
        ),
        Ok(Some(version)) => result(
            "schema",
            CheckStatus::Warn,
            format!("version {version}, expected {latest}"),
            started,
        ),
        Ok(None) => result(
            "schema",
            CheckStatus::Fail,
            "no migration history".to_string(),
            started,
        ),
        Err(e) => result("schema", CheckStatus::Fail, e.to_string(), started),
    }
}

async fn check_integrity(controller: &PersistenceController) -> CheckResult {
    let started = Instant::now();
    match controller.integrity_check().await {
        Ok(lines) if lines.len() == 1 && lines[0] == "ok" => {
            result("integrity", CheckStatus::Pass, "ok".to_string(), started)
        }
        Ok(lines) => result(
            "integrity",
            CheckStatus::Fail,
            format!("{} problem(s): {}", lines.len(), lines.join("; ")),
            started,
        ),
        Err(e) => result("integrity", CheckStatus::Fail, e.to_string(), started),
    }
}

/// Run the `burrow doctor` command. Fails when any check fails.
pub async fn run_doctor(controller: &PersistenceController, plain: bool) -> Result<(), BurrowError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let results = run_checks(controller).await;

    println!();
    println!("  burrow doctor");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;
    for check in &results {
        let duration_ms = check.duration.as_millis();
        let marker = match (&check.status, use_color) {
            (CheckStatus::Pass, true) => {
                use colored::Colorize;
                "✓".green().to_string()
            }
            (CheckStatus::Warn, true) => {
                use colored::Colorize;
                "!".yellow().to_string()
            }
            (CheckStatus::Fail, true) => {
                use colored::Colorize;
                "✗".red().to_string()
            }
            (CheckStatus::Pass, false) => "[OK]  ".to_string(),
            (CheckStatus::Warn, false) => "[WARN]".to_string(),
            (CheckStatus::Fail, false) => "[FAIL]".to_string(),
        };
        match check.status {
            CheckStatus::Warn => warn_count += 1,
            CheckStatus::Fail => fail_count += 1,
            CheckStatus::Pass => {}
        }
        println!(
            "    {marker} {:<12} {} ({duration_ms}ms)",
            check.name, check.message
        );
    }
    println!();

    if fail_count + warn_count == 0 {
        println!("  All checks passed.");
    } else {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    }
    println!();

    if fail_count > 0 {
        return Err(BurrowError::Internal(format!("{fail_count} check(s) failed")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_config::model::{RetentionConfig, StorageConfig};

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
    async fn healthy_store_passes_every_check() {
        let controller = controller_at(":memory:");
        assert!(controller.open().await);
        let results = run_checks(&controller).await;
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["store", "schema", "integrity"]);
        assert!(results.iter().all(|r| r.status == CheckStatus::Pass));
        run_doctor(&controller, true).await.unwrap();
        controller.close().await.unwrap();
    }

    #[tokio::test]
    async fn unopened_store_fails_fast() {
        let controller = controller_at(":memory:");
        let results = run_checks(&controller).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, CheckStatus::Fail);
        assert!(run_doctor(&controller, true).await.is_err());
    }
}
