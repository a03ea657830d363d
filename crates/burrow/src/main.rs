// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Burrow - operator tooling for the on-device telemetry store.
//!
//! This is the binary entry point. Each subcommand opens the store named by
//! the configuration, does one job, and closes it again.

mod doctor;
mod maintenance;
mod status;

use std::path::PathBuf;

use burrow_config::BurrowConfig;
use burrow_core::BurrowError;
use burrow_storage::PersistenceController;
use clap::{Parser, Subcommand};

/// Burrow - inspect and maintain a telemetry store.
#[derive(Parser, Debug)]
#[command(name = "burrow", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show whether the store opens, its schema version and row counts.
    Status {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Delete records older than the given age.
    Sweep {
        /// Age cutoff in days; defaults to `retention.max_record_age_days`.
        #[arg(long)]
        older_than_days: Option<u32>,
    },
    /// Delete messages and commands whose session no longer exists.
    PurgeOrphans,
    /// Run store diagnostics.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => burrow_config::load_and_validate_path(path),
        None => burrow_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            burrow_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);

    let Some(command) = cli.command else {
        println!("burrow: use --help for available commands");
        return;
    };

    if let Err(e) = run(command, &config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &BurrowConfig) -> Result<(), BurrowError> {
    let controller = PersistenceController::from_config(config);
    // Status and doctor report a store that fails to open; the others need it.
    let opened = controller.open().await;

    let result = match command {
        Commands::Status { json, plain } => status::run_status(&controller, json, plain).await,
        Commands::Doctor { plain } => doctor::run_doctor(&controller, plain).await,
        Commands::Sweep { older_than_days } if opened => {
            let days = older_than_days.unwrap_or(config.retention.max_record_age_days);
            maintenance::run_sweep(&controller, days).await
        }
        Commands::PurgeOrphans if opened => maintenance::run_purge_orphans(&controller).await,
        Commands::Sweep { .. } | Commands::PurgeOrphans => Err(BurrowError::StoreUnavailable(
            format!("cannot open {}", controller.database_path()),
        )),
    };

    controller.close().await?;
    result
}

/// Initialize the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("burrow={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
