use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// Represents a historical price for a token on a calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Daily prices for one token, keyed by UTC calendar date.
pub type PriceMap = BTreeMap<NaiveDate, f64>;

/// All price maps for a run, keyed by configured token code.
///
/// Built once at startup and read-only afterwards; the valuation engine
/// never touches the source documents directly.
#[derive(Debug, Default)]
pub struct PriceBook {
    maps: HashMap<String, PriceMap>,
}

impl PriceBook {
    pub fn insert(&mut self, code: impl Into<String>, map: PriceMap) {
        self.maps.insert(code.into(), map);
    }

    pub fn contains(&self, code: &str) -> bool {
        self.maps.contains_key(code)
    }

    pub fn map(&self, code: &str) -> Option<&PriceMap> {
        self.maps.get(code)
    }

    pub fn price_on(&self, code: &str, date: NaiveDate) -> Option<f64> {
        self.maps.get(code)?.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}
