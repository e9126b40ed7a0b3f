//! Random portfolio construction.
//!
//! A demonstration portfolio assigns each security a position worth its
//! current price times a uniformly drawn whole number of shares.

use crate::error::{Result, VarError};
use crate::types::Portfolio;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Inclusive range of share counts drawn for each position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareCountRange {
    pub min_shares: u64,
    pub max_shares: u64,
}

impl Default for ShareCountRange {
    fn default() -> Self {
        Self {
            min_shares: 0,
            max_shares: 1000,
        }
    }
}

impl ShareCountRange {
    pub fn new(min_shares: u64, max_shares: u64) -> Result<Self> {
        let range = Self {
            min_shares,
            max_shares,
        };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_shares > self.max_shares {
            return Err(VarError::ConfigError(format!(
                "min_shares ({}) exceeds max_shares ({})",
                self.min_shares, self.max_shares
            )));
        }
        Ok(())
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.gen_range(self.min_shares..=self.max_shares)
    }
}

/// Build a random portfolio from current prices.
///
/// Each ticker is assigned `price * shares` with `shares` drawn uniformly from
/// `range`. Draws happen in ticker order, so a given seed always produces the
/// same portfolio.
pub fn random_portfolio(
    prices: &BTreeMap<String, f64>,
    range: &ShareCountRange,
    seed: u64,
) -> Result<Portfolio> {
    range.validate()?;
    if prices.is_empty() {
        return Err(VarError::InvalidInput(
            "Cannot build a portfolio without prices".to_string(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut portfolio = Portfolio::new();

    for (ticker, &price) in prices {
        if !price.is_finite() || price <= 0.0 {
            return Err(VarError::InvalidInput(format!(
                "Invalid price for {}: {}",
                ticker, price
            )));
        }
        let shares = range.sample(&mut rng);
        debug!("{}: {} shares at {:.2}", ticker, shares, price);
        portfolio.insert(ticker.clone(), price * shares as f64);
    }

    info!(
        "Built random portfolio of {} positions worth {:.2}",
        portfolio.len(),
        portfolio.total_value()
    );
    Ok(portfolio)
}
