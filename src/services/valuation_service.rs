use std::collections::HashSet;
use std::fs::File;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, WriterBuilder};
use tracing::warn;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::{PriceBook, RowSchema};

/// Strict format of the ledger's UTC date column.
const ROW_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Already priced, or neither side matches a known token.
    Unchanged,
    /// A token matched but the row could not be valued; left as-is.
    Skipped,
    /// Net-worth amount and currency were filled in.
    Updated,
}

enum Mode {
    Priced,
    Stable,
}

/// Values one row at a time against an immutable price book.
pub struct RowValuer<'a> {
    schema: &'a RowSchema,
    book: &'a PriceBook,
    stable_tokens: &'a HashSet<String>,
    net_worth_currency: &'a str,
}

impl<'a> RowValuer<'a> {
    pub fn new(schema: &'a RowSchema, book: &'a PriceBook, config: &'a Config) -> Self {
        Self {
            schema,
            book,
            stable_tokens: &config.stable_tokens,
            net_worth_currency: &config.net_worth_currency,
        }
    }

    /// Fills the row's net-worth fields in place when it can be valued.
    ///
    /// Token selection precedence: priced tokens before stable assets, and
    /// within each category the "to" side before the "from" side.
    pub fn value_row(&self, row: &mut [String]) -> RowOutcome {
        if parse_amount(&row[self.schema.net_worth_amount]) != 0.0 {
            return RowOutcome::Unchanged;
        }

        let to_currency = row[self.schema.to_currency].trim();
        let from_currency = row[self.schema.from_currency].trim();

        let (token_code, amount_idx, mode) = if self.book.contains(to_currency) {
            (to_currency.to_string(), self.schema.to_amount, Mode::Priced)
        } else if self.book.contains(from_currency) {
            (from_currency.to_string(), self.schema.from_amount, Mode::Priced)
        } else if self.stable_tokens.contains(to_currency) {
            (to_currency.to_string(), self.schema.to_amount, Mode::Stable)
        } else if self.stable_tokens.contains(from_currency) {
            (from_currency.to_string(), self.schema.from_amount, Mode::Stable)
        } else {
            return RowOutcome::Unchanged;
        };

        let amount = parse_amount(&row[amount_idx]);
        if amount == 0.0 {
            // A zero-amount transfer is never considered priced.
            return RowOutcome::Skipped;
        }

        let net_worth = match mode {
            // Stable assets are pegged 1:1, the amount is already USD.
            Mode::Stable => amount,
            Mode::Priced => {
                let date_raw = row[self.schema.date].trim().to_string();
                let Ok(ts) = NaiveDateTime::parse_from_str(&date_raw, ROW_DATE_FORMAT) else {
                    warn!("Could not parse row date '{}', skipping row", date_raw);
                    return RowOutcome::Skipped;
                };
                let date = ts.date();
                let Some(price) = self.book.price_on(&token_code, date) else {
                    warn!("No price for token {} on {}, skipping row", token_code, date);
                    return RowOutcome::Skipped;
                };
                amount * price
            }
        };

        row[self.schema.net_worth_amount] = format!("{net_worth:.8}");
        row[self.schema.net_worth_currency] = self.net_worth_currency.to_string();
        RowOutcome::Updated
    }
}

/// Streams the input ledger to the output, filling missing net-worth values.
/// Every input row is written exactly once, in order, whatever its outcome.
pub fn backfill(config: &Config, book: &PriceBook) -> Result<RunSummary, AppError> {
    let input = File::open(&config.input_csv)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let header = reader.headers().map_err(|_| AppError::Header)?.clone();
    let schema = RowSchema::resolve(&header, &config.columns)?;

    let output = File::create(&config.output_csv)?;
    let mut writer = WriterBuilder::new().flexible(true).from_writer(output);
    writer.write_record(schema.header())?;

    let valuer = RowValuer::new(&schema, book, config);
    let mut summary = RunSummary::default();

    for result in reader.records() {
        let record = result?;
        let mut row = schema.materialize(&record);
        match valuer.value_row(&mut row) {
            RowOutcome::Updated => summary.updated += 1,
            RowOutcome::Skipped => summary.skipped += 1,
            RowOutcome::Unchanged => {}
        }
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(summary)
}

/// Blank or unparsable amounts count as zero, matching how the ledger
/// export leaves unpriced fields empty.
fn parse_amount(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnNames;
    use crate::models::PriceMap;
    use chrono::NaiveDate;
    use csv::StringRecord;

    const STX: &str = "STX;1770845";
    const USDC: &str = "USDC;7483231";

    fn schema() -> RowSchema {
        let header = StringRecord::from(vec![
            "Date (UTC)",
            "From Amount",
            "From Currency",
            "To Amount",
            "To Currency",
            "Net Worth Amount",
            "Net Worth Currency",
        ]);
        RowSchema::resolve(&header, &ColumnNames::default()).unwrap()
    }

    fn book() -> PriceBook {
        let mut book = PriceBook::default();
        book.insert(
            STX,
            PriceMap::from([(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(), 2.5)]),
        );
        book
    }

    fn config() -> Config {
        serde_json::from_str(&format!(
            r#"{{
                "input_csv": "in.csv",
                "output_csv": "out.csv",
                "stable_tokens": ["{USDC}"],
                "tokens": []
            }}"#
        ))
        .unwrap()
    }

    fn row(date: &str, from_amt: &str, from_ccy: &str, to_amt: &str, to_ccy: &str, net: &str) -> Vec<String> {
        vec![date, from_amt, from_ccy, to_amt, to_ccy, net, ""]
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn value(row: &mut Vec<String>) -> RowOutcome {
        let schema = schema();
        let book = book();
        let config = config();
        RowValuer::new(&schema, &book, &config).value_row(row)
    }

    #[test]
    fn fills_priced_token_from_to_side() {
        let mut r = row("2024-03-05 10:30:00", "", "", "10", STX, "0");
        assert_eq!(value(&mut r), RowOutcome::Updated);
        assert_eq!(r[5], "25.00000000");
        assert_eq!(r[6], "USD;10");
    }

    #[test]
    fn already_priced_rows_pass_through() {
        let mut r = row("2024-03-05 10:30:00", "", "", "10", STX, "99.5");
        assert_eq!(value(&mut r), RowOutcome::Unchanged);
        assert_eq!(r[5], "99.5");
    }

    #[test]
    fn priced_token_beats_stable_asset() {
        // "to" side is a priced token, "from" side a stablecoin: the priced
        // path with the "to" amount must win.
        let mut r = row("2024-03-05 10:30:00", "150.25", USDC, "10", STX, "");
        assert_eq!(value(&mut r), RowOutcome::Updated);
        assert_eq!(r[5], "25.00000000");
    }

    #[test]
    fn to_side_beats_from_side_within_category() {
        let mut r = row("2024-03-05 10:30:00", "100", USDC, "150.25000000", USDC, "");
        assert_eq!(value(&mut r), RowOutcome::Updated);
        assert_eq!(r[5], "150.25000000");
        assert_eq!(r[6], "USD;10");
    }

    #[test]
    fn stable_asset_copies_amount_verbatim() {
        let mut r = row("2024-03-05 10:30:00", "150.25000000", USDC, "", "", "");
        assert_eq!(value(&mut r), RowOutcome::Updated);
        assert_eq!(r[5], "150.25000000");
        assert_eq!(r[6], "USD;10");
    }

    #[test]
    fn unknown_currencies_pass_through() {
        let mut r = row("2024-03-05 10:30:00", "5", "BTC", "100", "ETH", "");
        assert_eq!(value(&mut r), RowOutcome::Unchanged);
        assert_eq!(r[5], "");
        assert_eq!(r[6], "");
    }

    #[test]
    fn zero_amount_counts_as_skipped() {
        let mut r = row("2024-03-05 10:30:00", "", "", "0", STX, "");
        assert_eq!(value(&mut r), RowOutcome::Skipped);
        assert_eq!(r[5], "");
    }

    #[test]
    fn unparsable_date_counts_as_skipped() {
        let mut r = row("2024-03-05T10:30:00Z", "", "", "10", STX, "");
        assert_eq!(value(&mut r), RowOutcome::Skipped);
        assert_eq!(r[5], "");
    }

    #[test]
    fn missing_price_coverage_counts_as_skipped() {
        let mut r = row("2024-03-06 10:30:00", "", "", "10", STX, "0");
        assert_eq!(value(&mut r), RowOutcome::Skipped);
        assert_eq!(r[5], "0");
        assert_eq!(r[6], "");
    }

    #[test]
    fn stable_dates_are_irrelevant() {
        // The stable path never touches the date column.
        let mut r = row("garbage", "", "", "42.5", USDC, "");
        assert_eq!(value(&mut r), RowOutcome::Updated);
        assert_eq!(r[5], "42.50000000");
    }
}
