//! lhdctl - maintenance CLI for the LHD audit report store
//!
//! Operator access to the same store the audit worker and HTTP API use:
//! - Connectivity check (`ping`)
//! - Report inspection (`report show|list|latest`)
//! - Retention (`prune raw|old|all`)
//! - Worker status record (`system show|set-running|touch`)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lhd_store::{ConnectionManager, LhdConfig, ReportRepo};
use tracing::info;

mod commands;
mod tracing_setup;

use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "lhdctl",
    author,
    version,
    about = "Inspect and maintain the LHD audit report store",
    long_about = "Read audit reports, prune raw payloads and old reports, and manage the \
                  worker status record in the LHD MongoDB database."
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// MongoDB connection string (overrides LHD_MONGODB_URI and config.toml)
    #[arg(long, global = true, value_name = "URI")]
    uri: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the database is reachable
    Ping {
        /// Also create the indexes the report queries rely on
        #[arg(long)]
        ensure_indexes: bool,
    },
    /// Read audit reports
    Report(commands::report::ReportArgs),
    /// Apply report retention limits
    Prune(commands::prune::PruneArgs),
    /// Inspect or update the worker status record
    System(commands::system::SystemArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_setup::init_tracing(&TracingConfig { debug: cli.debug }).ok();

    lhd_store::load_dotenv();
    let mut config = LhdConfig::load().context("Failed to load configuration")?;
    if let Some(uri) = cli.uri {
        config.mongodb_uri = uri;
    }

    let manager = ConnectionManager::new();
    let conn = manager
        .connect_database(&config.mongodb_uri)
        .await
        .context("Failed to connect to MongoDB")?;

    match cli.command {
        Commands::Ping { ensure_indexes } => {
            conn.ping().await.context("Ping failed")?;
            if ensure_indexes {
                ReportRepo::new(conn.database())
                    .ensure_indexes()
                    .await
                    .context("Failed to ensure report indexes")?;
            }
            info!("Connected to database {}", conn.database().name());
            println!("ok");
        }
        Commands::Report(args) => commands::run_report(args, &conn).await?,
        Commands::Prune(args) => commands::run_prune(args, &conn, &config).await?,
        Commands::System(args) => commands::run_system(args, &conn).await?,
    }

    Ok(())
}
