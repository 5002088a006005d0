use std::fs::File;
use std::path::Path;

use csv::WriterBuilder;
use tracing::info;

use crate::config::RateExportJob;
use crate::errors::AppError;
use crate::models::{PriceBook, PriceMap};

/// Writes each configured token's daily series as a Koinly custom-price CSV.
///
/// Useful for tokens Koinly has no market data for, typically the chained
/// ones: the derived USD series can be re-imported as custom prices.
pub fn export_rates(jobs: &[RateExportJob], book: &PriceBook) -> Result<(), AppError> {
    for job in jobs {
        let map = book
            .map(&job.code)
            .ok_or_else(|| AppError::UnknownToken(job.code.clone()))?;
        let rows = write_rate_csv(map, &job.output_csv, &job.time_suffix)?;
        info!(
            "Wrote {} custom price rows for {} to {}",
            rows,
            job.code,
            job.output_csv.display()
        );
    }
    Ok(())
}

fn write_rate_csv(map: &PriceMap, path: &Path, time_suffix: &str) -> Result<usize, AppError> {
    let mut writer = WriterBuilder::new().from_writer(File::create(path)?);
    writer.write_record(["Date", "Rate"])?;

    // BTreeMap iteration gives ascending dates, as the import expects.
    for (date, rate) in map {
        writer.write_record([
            format!("{} {}", date.format("%Y-%m-%d"), time_suffix),
            format!("{rate:.12}"),
        ])?;
    }
    writer.flush()?;
    Ok(map.len())
}
