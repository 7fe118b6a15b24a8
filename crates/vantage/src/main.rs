//! Vantage - snapshot analytics over a columnar store
//!
//! # Usage
//!
//! ```bash
//! # Answer JSON requests, one per line, from a file or stdin
//! vantage run requests.jsonl
//! echo '{"kind":"distinct","table":"positions","field":"desk"}' | vantage run -
//!
//! # Inspect the configured tables
//! vantage tables
//!
//! # Align a date to a stored snapshot
//! vantage snapshot positions 2024-03-15
//! vantage snapshot positions 2024-03-15 --forward
//!
//! # Check the store is reachable
//! vantage health
//! ```

mod cmd;
mod setup;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Vantage - snapshot analytics over a columnar store
#[derive(Parser, Debug)]
#[command(name = "vantage")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer JSON requests and print response envelopes
    Run(cmd::run::RunArgs),

    /// List configured tables and their fields
    Tables(cmd::tables::TablesArgs),

    /// Resolve a date to a stored snapshot
    Snapshot(cmd::snapshot::SnapshotArgs),

    /// Check the analytical store is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = setup::load_config(cli.config.as_deref())?;

    let log_level = resolve_log_level(cli.log_level.as_deref(), &config);
    init_logging(&log_level)?;

    match cli.command {
        Command::Run(args) => cmd::run::run(args, &config).await,
        Command::Tables(args) => cmd::tables::run(args, &config),
        Command::Snapshot(args) => cmd::snapshot::run(args, &config).await,
        Command::Health => cmd::health::run(&config).await,
    }
}

/// Resolve log level: CLI flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, config: &vantage_config::Config) -> String {
    match cli_level {
        Some(level) => level.to_string(),
        None => config.log.level.as_str().to_string(),
    }
}

/// Initialize the tracing subscriber for logging
///
/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();

    Ok(())
}
