use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{PriceSource, TokenDescriptor};
use crate::errors::AppError;
use crate::models::{PriceBook, PriceMap, PricePoint};

/// Loads every configured token's price history into one immutable book.
///
/// Each source file is read exactly once; a document with a broken top-level
/// shape aborts the run, while individual bad entries are only warned about.
pub fn build_price_book(tokens: &[TokenDescriptor]) -> Result<PriceBook, AppError> {
    let mut book = PriceBook::default();
    for token in tokens {
        let map = load_price_map(&token.source)?;
        info!("Loaded {} daily prices for {}", map.len(), token.code);
        book.insert(token.code.clone(), map);
    }
    Ok(book)
}

pub fn load_price_map(source: &PriceSource) -> Result<PriceMap, AppError> {
    match source {
        PriceSource::Epoch { path } => parse_epoch_series(&read_document(path)?, path),
        PriceSource::Xy { path } => parse_xy_series(&read_document(path)?, path),
        PriceSource::Ohlc { path } => parse_ohlc_series(&read_document(path)?, path),
        PriceSource::Chained { base, quote } => {
            let base_map = load_price_map(base)?;
            let quote_map = load_price_map(quote)?;
            let combined = derive_chained_series(&base_map, &quote_map);
            info!(
                "Derived {} prices from {} base and {} quote dates",
                combined.len(),
                base_map.len(),
                quote_map.len()
            );
            Ok(combined)
        }
    }
}

fn read_document(path: &Path) -> Result<Value, AppError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn structure_error(path: &Path, detail: &str) -> AppError {
    AppError::PriceDocument {
        path: path.display().to_string(),
        detail: detail.to_string(),
    }
}

/// Parses { "stats": [[epoch_millis, price], ...] } documents.
/// Malformed entries are dropped without a warning.
pub fn parse_epoch_series(doc: &Value, path: &Path) -> Result<PriceMap, AppError> {
    let obj = doc
        .as_object()
        .ok_or_else(|| structure_error(path, "expected a top-level object with a 'stats' key"))?;

    let entries = match obj.get("stats") {
        Some(Value::Array(list)) => list.as_slice(),
        Some(_) => return Err(structure_error(path, "'stats' is not a list")),
        None => &[],
    };

    let mut points = Vec::new();
    for entry in entries {
        let Some(pair) = entry.as_array() else { continue };
        let (Some(ts), Some(price)) = (pair.first(), pair.get(1)) else {
            continue;
        };
        let Some(millis) = value_as_f64(ts) else { continue };
        let Some(price) = value_as_f64(price) else { continue };
        let Some(date) = date_from_epoch_millis(millis as i64) else {
            continue;
        };
        points.push(PricePoint { date, price });
    }
    Ok(collect_daily(points))
}

/// Parses [{ "x": iso_ts, "y": price }, ...] documents, either as a bare
/// list or wrapped in { "success": true, "data": [...] }.
pub fn parse_xy_series(doc: &Value, path: &Path) -> Result<PriceMap, AppError> {
    let entries: &[Value] = match doc {
        Value::Array(list) => list.as_slice(),
        Value::Object(obj) => match obj.get("data") {
            Some(Value::Array(list)) => list.as_slice(),
            Some(_) => return Err(structure_error(path, "'data' is not a list")),
            None => &[],
        },
        _ => {
            return Err(structure_error(
                path,
                "expected a list of {x, y} entries or an object with a 'data' key",
            ))
        }
    };

    let mut points = Vec::new();
    for entry in entries {
        let (Some(ts), Some(price)) = (entry.get("x"), entry.get("y")) else {
            continue;
        };
        let Some(ts) = ts.as_str() else { continue };
        let Some(date) = parse_naive_timestamp(ts) else {
            warn!("Could not parse timestamp '{}' in {}", ts, path.display());
            continue;
        };
        // Some feeds serialize prices as strings, e.g. { "y": "0.0059" }.
        let Some(price) = value_as_f64(price) else {
            warn!("Could not parse price {} in {}", price, path.display());
            continue;
        };
        points.push(PricePoint { date, price });
    }
    Ok(collect_daily(points))
}

/// Parses [{ "open": .., "close": .., "timestamp": iso_ts }, ...] documents.
/// Daily price is the open/close midpoint.
pub fn parse_ohlc_series(doc: &Value, path: &Path) -> Result<PriceMap, AppError> {
    let entries = doc
        .as_array()
        .ok_or_else(|| structure_error(path, "expected a top-level list of OHLC entries"))?;

    let mut points = Vec::new();
    for entry in entries {
        let (Some(ts), Some(open), Some(close)) = (
            entry.get("timestamp"),
            entry.get("open"),
            entry.get("close"),
        ) else {
            continue;
        };
        let Some(ts) = ts.as_str() else { continue };
        let Some(date) = parse_naive_timestamp(ts) else {
            warn!("Could not parse timestamp '{}' in {}", ts, path.display());
            continue;
        };
        let (Some(open), Some(close)) = (value_as_f64(open), value_as_f64(close)) else {
            warn!("Could not parse open/close in {} on {}", path.display(), date);
            continue;
        };
        points.push(PricePoint {
            date,
            price: (open + close) / 2.0,
        });
    }
    Ok(collect_daily(points))
}

/// Chains `A per B` and `B per C` series into `A per C`, keeping only dates
/// present in both. A date covered by one source alone cannot be priced.
pub fn derive_chained_series(base: &PriceMap, quote: &PriceMap) -> PriceMap {
    base.iter()
        .filter_map(|(date, base_price)| {
            quote
                .get(date)
                .map(|quote_price| (*date, base_price * quote_price))
        })
        .collect()
}

/// Collapses intraday points onto their calendar dates. When a source
/// reports several points for one day, the last parsed entry wins.
pub fn collect_daily(points: Vec<PricePoint>) -> PriceMap {
    let mut map = PriceMap::new();
    for point in points {
        map.insert(point.date, point.price);
    }
    map
}

fn date_from_epoch_millis(millis: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|ts| ts.date_naive())
}

/// Accepts ISO-8601 timestamps with a `T` or space separator, optional
/// fractional seconds, an optional trailing `Z`, or a bare date. No other
/// timezone offsets appear in these feeds.
fn parse_naive_timestamp(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('Z').unwrap_or(trimmed);

    if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.date());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ts.date());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
