use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::AppError;

/// Full run configuration, loaded once at startup from a JSON file.
///
/// The file path comes from the `BACKFILL_CONFIG` env var and defaults to
/// `backfill.json` in the working directory.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub input_csv: PathBuf,
    pub output_csv: PathBuf,

    /// Currency designator written into every net-worth cell we fill,
    /// e.g. Koinly's "USD;10".
    #[serde(default = "default_net_worth_currency")]
    pub net_worth_currency: String,

    #[serde(default)]
    pub columns: ColumnNames,

    /// Token codes treated as pegged 1:1 to USD; their transfer amount is
    /// copied verbatim with no price lookup.
    #[serde(default)]
    pub stable_tokens: HashSet<String>,

    /// Tokens that need a historical price lookup, each with its source.
    #[serde(default)]
    pub tokens: Vec<TokenDescriptor>,

    /// Optional custom-price CSV exports, written before row valuation.
    #[serde(default)]
    pub rate_exports: Vec<RateExportJob>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenDescriptor {
    pub code: String,
    pub source: PriceSource,
}

/// Where and in which shape a token's price history lives.
///
/// Serialized form uses a "format" tag:
/// { "format": "xy", "path": "stx_price.json" }
/// { "format": "chained", "base": {...}, "quote": {...} }
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum PriceSource {
    /// { "stats": [[epoch_millis, price], ...] }
    Epoch { path: PathBuf },
    /// [{ "x": iso_ts, "y": price }, ...] or { "data": [...] }
    Xy { path: PathBuf },
    /// [{ "open": .., "close": .., "timestamp": iso_ts }, ...]
    Ohlc { path: PathBuf },
    /// Product of two series sharing an intermediate asset,
    /// e.g. MAG/XRP * XRP/USD -> MAG/USD.
    Chained {
        base: Box<PriceSource>,
        quote: Box<PriceSource>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateExportJob {
    pub code: String,
    pub output_csv: PathBuf,
    /// Time-of-day appended to each exported date, matching the Koinly
    /// custom-price sample files.
    #[serde(default = "default_time_suffix")]
    pub time_suffix: String,
}

/// CSV column names, defaulting to the Koinly export schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub date: String,
    pub to_currency: String,
    pub to_amount: String,
    pub from_currency: String,
    pub from_amount: String,
    pub net_worth_amount: String,
    pub net_worth_currency: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            date: "Date (UTC)".to_string(),
            to_currency: "To Currency".to_string(),
            to_amount: "To Amount".to_string(),
            from_currency: "From Currency".to_string(),
            from_amount: "From Amount".to_string(),
            net_worth_amount: "Net Worth Amount".to_string(),
            net_worth_currency: "Net Worth Currency".to_string(),
        }
    }
}

fn default_net_worth_currency() -> String {
    "USD;10".to_string()
}

fn default_time_suffix() -> String {
    "12:00:00".to_string()
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let path = std::env::var("BACKFILL_CONFIG")
            .unwrap_or_else(|_| "backfill.json".to_string());
        Self::from_file(Path::new(&path))
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("could not read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("invalid config {}: {}", path.display(), e)))
    }
}
