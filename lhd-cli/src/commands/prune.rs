//! Retention commands
//!
//! Commands: raw, old, all. Limits default to the loaded configuration.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lhd_store::{Connection, LhdConfig, ReportRepo};

#[derive(Parser, Debug)]
pub struct PruneArgs {
    #[command(subcommand)]
    pub command: PruneCommands,
}

#[derive(Subcommand, Debug)]
pub enum PruneCommands {
    /// Discard raw payloads of all but the newest reports
    Raw(RawArgs),
    /// Delete reports older than the retention window
    Old(OldArgs),
    /// Run both raw and age pruning
    All {
        #[command(flatten)]
        raw: RawArgs,
        #[command(flatten)]
        old: OldArgs,
    },
}

#[derive(Parser, Debug)]
pub struct RawArgs {
    /// Number of newest reports that keep raw data (default: max_raw_reports)
    #[arg(long)]
    pub keep: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct OldArgs {
    /// Maximum report age in days (default: max_reports_age_days)
    #[arg(long)]
    pub max_age_days: Option<u64>,
}

pub async fn run_prune(args: PruneArgs, conn: &Connection, config: &LhdConfig) -> Result<()> {
    let repo = ReportRepo::new(conn.database());

    match args.command {
        PruneCommands::Raw(raw) => prune_raw(&repo, raw, config).await,
        PruneCommands::Old(old) => prune_old(&repo, old, config).await,
        PruneCommands::All { raw, old } => {
            prune_raw(&repo, raw, config).await?;
            prune_old(&repo, old, config).await
        }
    }
}

async fn prune_raw(repo: &ReportRepo<'_>, args: RawArgs, config: &LhdConfig) -> Result<()> {
    let keep = args.keep.unwrap_or(config.max_raw_reports);
    let cleared = repo
        .clear_reports(keep)
        .await
        .context("Failed to clear raw report data")?;
    println!("Cleared raw data from {} reports (kept newest {})", cleared, keep);
    Ok(())
}

async fn prune_old(repo: &ReportRepo<'_>, args: OldArgs, config: &LhdConfig) -> Result<()> {
    let max_age = match args.max_age_days {
        Some(days) => Duration::from_secs(days.saturating_mul(86_400)),
        None => config.max_reports_age(),
    };
    let removed = repo
        .remove_old_reports(max_age)
        .await
        .context("Failed to remove old reports")?;
    println!(
        "Removed {} reports older than {} days",
        removed,
        max_age.as_secs() / 86_400
    );
    Ok(())
}
