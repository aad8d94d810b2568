mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "storesync",
    version,
    about = "Durable catalog synchronization engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config YAML file
    #[arg(long, default_value = "storesync.yml", global = true)]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one full sync run
    Run {
        /// Record the run as scheduler-triggered
        #[arg(long)]
        scheduled: bool,
    },
    /// Validate config, source reachability, and destination health
    Check,
    /// Page through the work queue
    Queue {
        /// Filter by status (pending, processing, completed, failed)
        #[arg(long)]
        status: Option<String>,
        /// Substring match against key or display name
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        per_page: u32,
    },
    /// Re-queue failed items (all of them, or one key)
    Retry {
        /// Natural key of a single item to retry
        key: Option<String>,
    },
    /// Show recent unresolved errors, or resolve one
    Errors {
        #[arg(long, default_value_t = 24)]
        hours: u32,
        /// Mark this error id resolved instead of listing
        #[arg(long)]
        resolve: Option<i64>,
    },
    /// Today's stats, daily aggregates, and run history
    Stats {
        /// Number of history rows to show
        #[arg(long, default_value_t = 10)]
        history: u32,
    },
    /// Reset items stuck in processing
    Reap,
    /// Delete completed items past the retention window
    Purge {
        /// Override the configured retention in days
        #[arg(long)]
        days: Option<u32>,
    },
    /// Unattended mode: scheduled runs, reaper, retention sweep
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    let config = storesync_engine::config::load(&cli.config)?;

    match cli.command {
        Commands::Run { scheduled } => commands::run::execute(&config, scheduled).await,
        Commands::Check => commands::check::execute(&config).await,
        Commands::Queue {
            status,
            search,
            page,
            per_page,
        } => commands::queue::execute(&config, status.as_deref(), search, page, per_page),
        Commands::Retry { key } => commands::retry::execute(&config, key.as_deref()),
        Commands::Errors { hours, resolve } => commands::errors::execute(&config, hours, resolve),
        Commands::Stats { history } => commands::stats::execute(&config, history),
        Commands::Reap => commands::reap::execute(&config),
        Commands::Purge { days } => commands::purge::execute(&config, days),
        Commands::Watch => commands::watch::execute(&config).await,
    }
}
