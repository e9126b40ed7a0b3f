//! Seeded random-walk simulation of a portfolio.
//!
//! Each simulated day draws one normal sample per security from that
//! security's (mean, std dev) of daily percent change and scales its position
//! by `(sample + 100) / 100`. A run is a pure function of its seed, the
//! initial portfolio, the distribution parameters and the day count.

use crate::error::{Result, VarError};
use crate::types::{DistributionMap, Portfolio};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Normal samplers aligned with a portfolio's ticker order.
struct ReturnSamplers {
    normals: Vec<Normal<f64>>,
}

impl ReturnSamplers {
    fn new(portfolio: &Portfolio, params: &DistributionMap) -> Result<Self> {
        let normals = portfolio
            .tickers()
            .map(|ticker| {
                let p = params.get(ticker).ok_or_else(|| VarError::MissingParameters {
                    ticker: ticker.to_string(),
                })?;
                let invalid = || VarError::InvalidDistribution {
                    ticker: ticker.to_string(),
                    mean: p.mean,
                    std_dev: p.std_dev,
                };
                if !p.mean.is_finite() || !p.std_dev.is_finite() || p.std_dev < 0.0 {
                    return Err(invalid());
                }
                Normal::new(p.mean, p.std_dev).map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { normals })
    }

    /// Advance every position by one day of simulated returns.
    fn apply<R: Rng + ?Sized>(&self, portfolio: &mut Portfolio, rng: &mut R) {
        for ((_, value), normal) in portfolio.iter_mut().zip(&self.normals) {
            let pct = normal.sample(rng);
            *value *= (pct + 100.0) / 100.0;
        }
    }
}

/// Simulate a single day.
///
/// Returns a new portfolio; the input is left untouched.
pub fn simulate_step<R: Rng + ?Sized>(
    portfolio: &Portfolio,
    params: &DistributionMap,
    rng: &mut R,
) -> Result<Portfolio> {
    let samplers = ReturnSamplers::new(portfolio, params)?;
    let mut next = portfolio.clone();
    samplers.apply(&mut next, rng);
    Ok(next)
}

/// Simulate `days` consecutive days from a seeded generator.
///
/// With `days == 0` the initial portfolio is returned unchanged.
pub fn simulate(
    portfolio: &Portfolio,
    params: &DistributionMap,
    days: usize,
    seed: u64,
) -> Result<Portfolio> {
    let samplers = ReturnSamplers::new(portfolio, params)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut current = portfolio.clone();
    for _ in 0..days {
        samplers.apply(&mut current, &mut rng);
    }
    Ok(current)
}

/// One seeded run together with its daily total value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationPath {
    pub seed: u64,
    pub final_portfolio: Portfolio,
    /// Total portfolio value at each day index; `history[0]` is the initial value.
    pub history: Vec<f64>,
}

impl SimulationPath {
    pub fn days(&self) -> usize {
        self.history.len().saturating_sub(1)
    }

    pub fn initial_value(&self) -> f64 {
        self.history.first().copied().unwrap_or(0.0)
    }

    pub fn final_value(&self) -> f64 {
        self.history.last().copied().unwrap_or(0.0)
    }

    /// Final value minus initial value.
    pub fn gain(&self) -> f64 {
        self.final_value() - self.initial_value()
    }
}

/// Like [`simulate`], additionally recording the total value after every day.
///
/// The history has `days + 1` entries and the final portfolio is identical to
/// what [`simulate`] returns for the same seed.
pub fn simulate_with_history(
    portfolio: &Portfolio,
    params: &DistributionMap,
    days: usize,
    seed: u64,
) -> Result<SimulationPath> {
    let entries = days.checked_add(1).ok_or_else(|| {
        VarError::InvalidInput(format!("Too many days to record a history: {}", days))
    })?;
    let samplers = ReturnSamplers::new(portfolio, params)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut current = portfolio.clone();

    let mut history = Vec::with_capacity(entries);
    history.push(current.total_value());
    for _ in 0..days {
        samplers.apply(&mut current, &mut rng);
        history.push(current.total_value());
    }

    Ok(SimulationPath {
        seed,
        final_portfolio: current,
        history,
    })
}
