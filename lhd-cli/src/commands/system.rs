//! Worker status commands
//!
//! Commands: show, set-running, touch

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use lhd_store::{Connection, SystemRepo};

#[derive(Parser, Debug)]
pub struct SystemArgs {
    #[command(subcommand)]
    pub command: SystemCommands,
}

#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Show the worker status record
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the worker running flag (e.g. clear it after a crashed run)
    SetRunning {
        #[arg(value_enum)]
        state: RunningState,
    },
    /// Set the worker last-run timestamp
    Touch {
        /// RFC 3339 timestamp (default: now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningState {
    On,
    Off,
}

pub async fn run_system(args: SystemArgs, conn: &Connection) -> Result<()> {
    let repo = SystemRepo::new(conn.database());

    match args.command {
        SystemCommands::Show { json } => {
            let info = repo
                .get_system_object()
                .await
                .context("Failed to load system info")?
                .unwrap_or_default();
            let last_run = info.worker_last_run.map(|at| at.to_rfc3339());

            if json {
                let value = serde_json::json!({
                    "worker_last_run": last_run,
                    "worker_is_running": info.worker_is_running,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!(
                    "worker running:  {}",
                    if info.worker_is_running { "yes" } else { "no" }
                );
                println!(
                    "worker last run: {}",
                    last_run.as_deref().unwrap_or("never")
                );
            }
            Ok(())
        }
        SystemCommands::SetRunning { state } => {
            let running = state == RunningState::On;
            repo.set_worker_is_running(running)
                .await
                .context("Failed to update worker_is_running")?;
            println!("worker_is_running = {}", running);
            Ok(())
        }
        SystemCommands::Touch { at } => {
            let at = at.unwrap_or_else(Utc::now);
            repo.set_worker_last_run_date(at)
                .await
                .context("Failed to update worker_last_run")?;
            println!("worker_last_run = {}", at.to_rfc3339());
            Ok(())
        }
    }
}
