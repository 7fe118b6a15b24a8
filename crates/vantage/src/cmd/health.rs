//! Health command - check the analytical store is reachable

use anyhow::{Context, Result};
use vantage_config::Config;

use crate::setup;

/// Run the command
pub async fn run(config: &Config) -> Result<()> {
    let engine = setup::build_engine(config)?;
    engine
        .health_check()
        .await
        .context("analytical store is unreachable")?;
    println!("ok");
    Ok(())
}
