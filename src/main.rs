use anyhow::Context;

use networth_backfill::app;
use networth_backfill::config::Config;
use networth_backfill::logging::{init_logging, LoggingConfig};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(&LoggingConfig::from_env());

    let config = Config::from_env().context("Failed to load run configuration")?;
    app::run(&config).context("Backfill run failed")?;

    Ok(())
}
