//! Core data types for the value-at-risk simulator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

/// A single closing price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
}

impl PriceRecord {
    pub fn new(ticker: impl Into<String>, date: NaiveDate, close: f64) -> Self {
        Self {
            ticker: ticker.into(),
            date,
            close,
        }
    }

    /// A close is usable when it is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

/// Daily percent change of a security from its previous close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub ticker: String,
    pub date: NaiveDate,
    /// `(close / previous_close - 1) * 100`.
    pub pct_change: f64,
}

/// Normal approximation of a security's daily percent change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionParams {
    /// Mean daily percent change.
    pub mean: f64,
    /// Standard deviation of the daily percent change.
    pub std_dev: f64,
}

impl DistributionParams {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }
}

impl fmt::Display for DistributionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N({:.4}%, {:.4}%)", self.mean, self.std_dev)
    }
}

/// Per-ticker distribution parameters, ordered by ticker.
pub type DistributionMap = BTreeMap<String, DistributionParams>;

/// Dollar value held in each security.
///
/// Iteration is in ticker order, which fixes the order of random draws during
/// a simulation step and keeps seeded runs reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Portfolio {
    positions: BTreeMap<String, f64>,
}

impl Portfolio {
    /// Create an empty portfolio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a portfolio from explicit (ticker, value) pairs.
    pub fn from_positions<I, S>(positions: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            positions: positions
                .into_iter()
                .map(|(ticker, value)| (ticker.into(), value))
                .collect(),
        }
    }

    /// Set the value held in a ticker, returning the previous value if any.
    pub fn insert(&mut self, ticker: impl Into<String>, value: f64) -> Option<f64> {
        self.positions.insert(ticker.into(), value)
    }

    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.positions.get(ticker).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.positions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, f64> {
        self.positions.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, f64> {
        self.positions.iter_mut()
    }

    /// Sum of all position values.
    pub fn total_value(&self) -> f64 {
        self.positions.values().sum()
    }
}

impl<'a> IntoIterator for &'a Portfolio {
    type Item = (&'a String, &'a f64);
    type IntoIter = btree_map::Iter<'a, String, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portfolio_total_value() {
        let portfolio = Portfolio::from_positions([("AAPL", 1_500.0), ("MSFT", 2_500.0)]);
        assert_eq!(portfolio.len(), 2);
        assert!((portfolio.total_value() - 4_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_portfolio_iterates_in_ticker_order() {
        let mut portfolio = Portfolio::new();
        portfolio.insert("MSFT", 1.0);
        portfolio.insert("AAPL", 2.0);
        portfolio.insert("GOOG", 3.0);

        let tickers: Vec<&str> = portfolio.tickers().collect();
        assert_eq!(tickers, vec!["AAPL", "GOOG", "MSFT"]);
    }

    #[test]
    fn test_portfolio_insert_replaces() {
        let mut portfolio = Portfolio::new();
        assert_eq!(portfolio.insert("AAPL", 10.0), None);
        assert_eq!(portfolio.insert("AAPL", 20.0), Some(10.0));
        assert_eq!(portfolio.get("AAPL"), Some(20.0));
        assert_eq!(portfolio.get("TSLA"), None);
    }

    #[test]
    fn test_portfolio_serializes_as_map() {
        let portfolio = Portfolio::from_positions([("AAPL", 100.0)]);
        let json = serde_json::to_string(&portfolio).unwrap();
        assert_eq!(json, r#"{"AAPL":100.0}"#);
    }

    #[test]
    fn test_price_record_validity() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(PriceRecord::new("AAPL", date, 185.6).is_valid());
        assert!(!PriceRecord::new("AAPL", date, 0.0).is_valid());
        assert!(!PriceRecord::new("AAPL", date, f64::NAN).is_valid());
    }
}
