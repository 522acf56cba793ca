//! Report inspection commands
//!
//! Commands: show, list, latest. Reports are printed as JSON on stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lhd_store::{Connection, Report, ReportRepo};
use serde_json::Value;

#[derive(Parser, Debug)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub command: ReportCommands,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Show a single report by id
    Show {
        /// Report id (24 character hex ObjectId)
        id: String,
        /// Include the raw audit payload
        #[arg(long)]
        raw: bool,
    },
    /// List the most recent reports for a site
    List {
        /// Site identifier
        #[arg(long)]
        site: String,
        /// Maximum number of reports to return
        #[arg(long, default_value_t = 10)]
        limit: u32,
        /// Include the raw audit payload
        #[arg(long)]
        raw: bool,
    },
    /// Show the latest report for a site
    Latest {
        /// Site identifier
        #[arg(long)]
        site: String,
        /// Include the raw audit payload
        #[arg(long)]
        raw: bool,
    },
}

pub async fn run_report(args: ReportArgs, conn: &Connection) -> Result<()> {
    let repo = ReportRepo::new(conn.database());

    match args.command {
        ReportCommands::Show { id, raw } => {
            let report = repo
                .get_report_by_id(&id)
                .await
                .with_context(|| format!("Failed to load report {}", id))?;
            print_optional(report, raw, &format!("No report with id {}", id))
        }
        ReportCommands::List { site, limit, raw } => {
            let reports = repo
                .get_reports_by_site_id(&site, limit)
                .await
                .with_context(|| format!("Failed to list reports for site {}", site))?;
            let total = repo.count_for_site(&site).await?;
            tracing::info!("Showing {} of {} reports for {}", reports.len(), total, site);

            let items: Vec<Value> = reports.iter().map(|r| r.to_json(raw)).collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
            Ok(())
        }
        ReportCommands::Latest { site, raw } => {
            let report = repo
                .get_latest_report_by_site_id(&site)
                .await
                .with_context(|| format!("Failed to load latest report for site {}", site))?;
            print_optional(report, raw, &format!("No reports for site {}", site))
        }
    }
}

fn print_optional(report: Option<Report>, raw: bool, missing: &str) -> Result<()> {
    match report {
        Some(report) => {
            println!("{}", serde_json::to_string_pretty(&report.to_json(raw))?);
            Ok(())
        }
        None => anyhow::bail!("{}", missing),
    }
}
