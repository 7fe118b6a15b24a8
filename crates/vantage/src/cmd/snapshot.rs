//! Snapshot command - align a date to a stored snapshot

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Args;
use vantage_analytics::Direction;
use vantage_config::Config;

use crate::setup;

/// Snapshot command arguments
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Table to inspect
    pub table: String,

    /// Target date (YYYY-MM-DD); today when omitted
    pub date: Option<NaiveDate>,

    /// Least snapshot on or after the date instead of the greatest before
    #[arg(long)]
    pub forward: bool,
}

/// Run the command
pub async fn run(args: SnapshotArgs, config: &Config) -> Result<()> {
    let engine = setup::build_engine(config)?;
    let target = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let direction = if args.forward {
        Direction::Forward
    } else {
        Direction::Backward
    };

    let snapshot = engine
        .resolve_snapshot(&args.table, target, direction)
        .await?;
    println!("{}", snapshot);

    Ok(())
}
