//! members-sweep - delete completed or expired event messages
//!
//! Intended to run from cron. Threshold precedence: `--threshold` > config
//! file `event_message_clean_threshold` > 30 days.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use members_common::config::{database_path, resolve_root_folder, TomlConfig};
use members_common::db::init_database;
use members_sweep::Sweeper;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "members-sweep")]
#[command(about = "Delete completed and expired event messages")]
#[command(version)]
struct Args {
    /// Ids deleted per statement
    #[arg(short, long)]
    chunk_size: Option<usize>,

    /// Messages created before midnight this many days ago are deleted
    #[arg(short, long)]
    threshold: Option<u32>,

    /// Root folder holding members.db
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Config file (default: ~/.config/members/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, config_source) =
        TomlConfig::load(args.config.as_deref()).context("Failed to load config")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    config_source.log();

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let sweeper = Sweeper::new(
        pool.clone(),
        config.clean_threshold_days(args.threshold),
        config.sweep_chunk_size(args.chunk_size),
    )?;

    let report = sweeper.sweep().await.context("Event message cleanup failed")?;
    info!(
        "Deleted {} of {} event messages older than {} in {:.2}s",
        report.deleted,
        report.matched,
        report.cutoff,
        report.elapsed.as_secs_f64()
    );

    pool.close().await;
    Ok(())
}
