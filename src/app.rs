use tracing::info;

use crate::config::Config;
use crate::errors::AppError;
use crate::services::valuation_service::RunSummary;
use crate::services::{price_map_service, rate_export_service, valuation_service};

/// Runs one full pass: build the price book, write any configured rate
/// exports, then stream the ledger through the valuation engine.
pub fn run(config: &Config) -> Result<RunSummary, AppError> {
    let book = price_map_service::build_price_book(&config.tokens)?;
    rate_export_service::export_rates(&config.rate_exports, &book)?;

    let summary = valuation_service::backfill(config, &book)?;

    info!("Done. Updated rows: {}", summary.updated);
    info!("Skipped rows: {}", summary.skipped);
    info!("Wrote -> {}", config.output_csv.display());
    Ok(summary)
}
