//! Per-security return distribution estimation.
//!
//! Each ticker's daily percent changes are summarized by their arithmetic mean
//! and sample standard deviation, the parameters of the normal approximation
//! used by the simulator.

use crate::types::{DistributionMap, DistributionParams, ReturnRecord};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Arithmetic mean. Returns `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
///
/// Undefined for fewer than two observations.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Estimate the mean and standard deviation of each ticker's daily percent change.
///
/// Non-finite changes are ignored. Tickers left with fewer than two
/// observations have no defined standard deviation and are omitted.
pub fn estimate_distributions(returns: &[ReturnRecord]) -> DistributionMap {
    let mut by_ticker: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in returns.iter().filter(|r| r.pct_change.is_finite()) {
        by_ticker
            .entry(record.ticker.as_str())
            .or_default()
            .push(record.pct_change);
    }

    let mut params = DistributionMap::new();
    for (ticker, changes) in by_ticker {
        match (mean(&changes), sample_std_dev(&changes)) {
            (Some(m), Some(sd)) => {
                debug!(
                    "{}: mean {:.4}%, std dev {:.4}% over {} days",
                    ticker,
                    m,
                    sd,
                    changes.len()
                );
                params.insert(ticker.to_string(), DistributionParams::new(m, sd));
            }
            _ => warn!(
                "Skipping {}: need at least 2 daily returns, have {}",
                ticker,
                changes.len()
            ),
        }
    }

    params
}
