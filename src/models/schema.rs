use csv::StringRecord;

use crate::config::ColumnNames;
use crate::errors::AppError;

/// Resolved positions of the ledger columns within the CSV header.
///
/// The net-worth currency column is appended to the header when the input
/// lacks it; every other required column must already be present.
#[derive(Debug, Clone)]
pub struct RowSchema {
    header: Vec<String>,
    pub date: usize,
    pub to_currency: usize,
    pub to_amount: usize,
    pub from_currency: usize,
    pub from_amount: usize,
    pub net_worth_amount: usize,
    pub net_worth_currency: usize,
}

fn find(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|h| h == name)
}

fn require(header: &[String], name: &str) -> Result<usize, AppError> {
    find(header, name).ok_or_else(|| AppError::MissingColumn(name.to_string()))
}

impl RowSchema {
    pub fn resolve(header: &StringRecord, columns: &ColumnNames) -> Result<Self, AppError> {
        let mut header: Vec<String> = header.iter().map(str::to_string).collect();

        let date = require(&header, &columns.date)?;
        let to_currency = require(&header, &columns.to_currency)?;
        let to_amount = require(&header, &columns.to_amount)?;
        let from_currency = require(&header, &columns.from_currency)?;
        let from_amount = require(&header, &columns.from_amount)?;
        let net_worth_amount = require(&header, &columns.net_worth_amount)?;

        let net_worth_currency = match find(&header, &columns.net_worth_currency) {
            Some(idx) => idx,
            None => {
                header.push(columns.net_worth_currency.clone());
                header.len() - 1
            }
        };

        Ok(Self {
            header,
            date,
            to_currency,
            to_amount,
            from_currency,
            from_amount,
            net_worth_amount,
            net_worth_currency,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Copies a record into an owned row, padded to the header width so the
    /// appended currency column always has a slot.
    pub fn materialize(&self, record: &StringRecord) -> Vec<String> {
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        while row.len() < self.width() {
            row.push(String::new());
        }
        row
    }
}
