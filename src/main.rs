//! s3-backup-restore - Main entry point
//!
//! Tiered tar.gz backups of a data directory to S3, with per-tier retention
//! pruning and restore from the most recent (or a named) backup.

use anyhow::Result;
use clap::{Parser, Subcommand};
use s3_backup_restore::ops::restore::RestoreOutcome;
use s3_backup_restore::store::keys::Tier;
use s3_backup_restore::store::s3::S3Store;
use s3_backup_restore::{cron, ops, utils, Config};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one backup of the given tier
    Backup {
        #[arg(value_enum)]
        tier: Tier,
    },
    /// Restore the data directory from the most recent (or named) backup
    Restore,
    /// Run tier backups on their configured cadences until interrupted
    Cron,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    utils::logger::init(level)?;

    let config = Config::from_env()?;
    let store = S3Store::connect(&config.s3_bucket).await;

    match args.command {
        Command::Backup { tier } => {
            ops::backup::run(&store, &config, tier).await?;
        }
        Command::Restore => match ops::restore::run(&store, &config).await? {
            RestoreOutcome::Restored { .. } => {}
            RestoreOutcome::TargetNotEmpty => {
                tracing::info!("set RESTORE_FORCE=true to restore over a non-empty directory");
            }
        },
        Command::Cron => {
            cron::run(Arc::new(store), Arc::new(config)).await?;
        }
    }

    Ok(())
}
