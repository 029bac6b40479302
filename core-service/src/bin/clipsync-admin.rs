//! Clipsync administration tool
//!
//! Operates directly on the configured database; configuration comes from
//! the environment (and `.env`) exactly as for the server.
//!
//! # Commands
//!
//! - `reset-password` - Set a new password for an account
//! - `cleanup` - Delete clipboard items older than N days
//! - `stats` - Print user, item and pool figures as JSON

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use core_runtime::logging::init_logging;
use core_runtime::ServerConfig;
use core_service::ClipboardCore;
use std::path::PathBuf;

/// Clipboard sync administration.
#[derive(Parser)]
#[command(name = "clipsync-admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database file, overriding DB_PATH
    #[arg(global = true, short, long)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set a new password for an account
    ResetPassword {
        username: String,
        password: String,
    },

    /// Delete clipboard items older than the retention window
    Cleanup {
        /// Age in days; defaults to CLEANUP_DAYS
        #[arg(short, long)]
        days: Option<u32>,

        /// Compact the database file afterwards
        #[arg(long)]
        vacuum: bool,
    },

    /// Print store statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::from_env().context("failed to load configuration")?;
    if let Some(path) = cli.database {
        config.database_path = path;
    }
    init_logging(config.logging.clone()).context("failed to initialise logging")?;

    let core = ClipboardCore::bootstrap(&config)
        .await
        .context("failed to open the clipboard store")?;

    match cli.command {
        Commands::ResetPassword { username, password } => {
            core.accounts()
                .reset_password(&username, &password)
                .await
                .with_context(|| format!("failed to reset password for '{}'", username))?;
            println!("Password for '{}' has been reset", username);
        }
        Commands::Cleanup { days, vacuum } => {
            let days = days.unwrap_or(config.cleanup_days);
            let removed = core
                .maintenance()
                .cleanup(days)
                .await
                .context("cleanup failed")?;
            println!("Removed {} items older than {} days", removed, days);

            if vacuum {
                core.maintenance().vacuum().await.context("vacuum failed")?;
                println!("Database compacted");
            }
        }
        Commands::Stats => {
            let stats = core
                .maintenance()
                .store_stats()
                .await
                .context("failed to read statistics")?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
