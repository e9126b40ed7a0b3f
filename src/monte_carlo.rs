//! Monte Carlo value-at-risk estimation.
//!
//! Runs many independently seeded portfolio simulations, collects each run's
//! gain or loss relative to the initial value, sorts them and reads the VaR off
//! a low percentile of the sorted outcomes.
//!
//! # Example
//!
//! ```
//! use mcvar::monte_carlo::{VarConfig, VarSimulator};
//! use mcvar::types::{DistributionMap, DistributionParams, Portfolio};
//!
//! let portfolio = Portfolio::from_positions([("AAPL", 600_000.0), ("MSFT", 400_000.0)]);
//! let params: DistributionMap = [
//!     ("AAPL".to_string(), DistributionParams::new(0.05, 1.7)),
//!     ("MSFT".to_string(), DistributionParams::new(0.07, 1.5)),
//! ]
//! .into_iter()
//! .collect();
//!
//! let config = VarConfig::default().with_simulations(1_000).with_seed(42);
//! let report = VarSimulator::new(config).run(&portfolio, &params).unwrap();
//!
//! assert_eq!(report.distribution.len(), 1_000);
//! assert_eq!(report.var, report.distribution[50]);
//! ```

use crate::error::{Result, VarError};
use crate::simulation::simulate;
use crate::types::{DistributionMap, Portfolio};
use indicatif::{ProgressBar, ProgressStyle};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Configuration for a value-at-risk run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarConfig {
    /// Number of independent simulations.
    pub num_simulations: usize,
    /// Days simulated in each run.
    pub days: usize,
    /// Low percentile read as the VaR (e.g., 0.05 for 5%).
    pub percentile: f64,
    /// Master seed used to derive the per-run seeds (None for random).
    pub seed: Option<u64>,
    /// Show a progress bar while simulating.
    pub show_progress: bool,
}

impl Default for VarConfig {
    fn default() -> Self {
        Self {
            num_simulations: 10_000,
            days: 5,
            percentile: 0.05,
            seed: None,
            show_progress: false,
        }
    }
}

impl VarConfig {
    /// Create config for quick analysis.
    pub fn quick() -> Self {
        Self {
            num_simulations: 1_000,
            ..Default::default()
        }
    }

    /// Create config for thorough analysis.
    pub fn thorough() -> Self {
        Self {
            num_simulations: 100_000,
            ..Default::default()
        }
    }

    pub fn with_simulations(mut self, n: usize) -> Self {
        self.num_simulations = n;
        self
    }

    pub fn with_days(mut self, days: usize) -> Self {
        self.days = days;
        self
    }

    pub fn with_percentile(mut self, percentile: f64) -> Self {
        self.percentile = percentile;
        self
    }

    /// Set master seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_simulations == 0 {
            return Err(VarError::ConfigError(
                "num_simulations must be at least 1".to_string(),
            ));
        }
        if !(self.percentile > 0.0 && self.percentile < 1.0) {
            return Err(VarError::ConfigError(format!(
                "percentile must be in (0, 1), got {}",
                self.percentile
            )));
        }
        Ok(())
    }
}

/// Derive `count` run seeds from a master seed.
pub fn generate_seeds(count: usize, master_seed: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(master_seed);
    (0..count).map(|_| rng.gen()).collect()
}

/// Index of percentile `p` in a sorted list of `len` values: `floor(len * p)`,
/// clamped to the last element.
pub fn percentile_index(len: usize, p: f64) -> usize {
    let idx = (len as f64 * p).floor() as usize;
    idx.min(len.saturating_sub(1))
}

/// Value at percentile `p` of sorted data, or `None` if empty.
pub fn value_at_percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    Some(sorted[percentile_index(sorted.len(), p)])
}

/// A single (percentile, gain) point of the outcome distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentilePoint {
    pub percentile: f64,
    pub value: f64,
}

const REPORTED_PERCENTILES: [f64; 9] = [0.01, 0.05, 0.10, 0.25, 0.50, 0.75, 0.90, 0.95, 0.99];

/// Results of a value-at-risk run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarReport {
    /// Master seed actually used.
    pub master_seed: u64,
    pub num_simulations: usize,
    pub days: usize,
    pub percentile: f64,
    /// Number of securities in the portfolio.
    pub num_positions: usize,
    /// Total portfolio value before simulation.
    pub initial_value: f64,
    /// Gain at the selected percentile; negative values are losses.
    pub var: f64,
    /// Mean gain over the tail up to and including the VaR index.
    pub expected_shortfall: f64,
    pub mean_gain: f64,
    pub median_gain: f64,
    pub std_gain: f64,
    /// Fraction of runs that ended below the initial value.
    pub prob_loss: f64,
    pub percentiles: Vec<PercentilePoint>,
    /// Every run's gain, sorted ascending.
    pub distribution: Vec<f64>,
}

impl VarReport {
    /// Build a report from unsorted per-run gains.
    pub fn from_gains(
        config: &VarConfig,
        master_seed: u64,
        num_positions: usize,
        initial_value: f64,
        mut gains: Vec<f64>,
    ) -> Result<Self> {
        if gains.is_empty() {
            return Err(VarError::InvalidInput(
                "No simulation outcomes to aggregate".to_string(),
            ));
        }

        gains.sort_by(|a, b| a.total_cmp(b));

        let n = gains.len();
        let var_idx = percentile_index(n, config.percentile);
        let var = gains[var_idx];
        let tail = &gains[..=var_idx];
        let expected_shortfall = tail.iter().sum::<f64>() / tail.len() as f64;

        let mean_gain = gains.iter().sum::<f64>() / n as f64;
        let std_gain =
            (gains.iter().map(|g| (g - mean_gain).powi(2)).sum::<f64>() / n as f64).sqrt();
        let median_gain = gains[percentile_index(n, 0.5)];
        let prob_loss = gains.iter().filter(|&&g| g < 0.0).count() as f64 / n as f64;

        let percentiles = REPORTED_PERCENTILES
            .iter()
            .map(|&p| PercentilePoint {
                percentile: p,
                value: gains[percentile_index(n, p)],
            })
            .collect();

        Ok(Self {
            master_seed,
            num_simulations: n,
            days: config.days,
            percentile: config.percentile,
            num_positions,
            initial_value,
            var,
            expected_shortfall,
            mean_gain,
            median_gain,
            std_gain,
            prob_loss,
            percentiles,
            distribution: gains,
        })
    }

    /// Loss amount implied by the VaR, zero if the percentile outcome is a gain.
    pub fn loss_at_risk(&self) -> f64 {
        (-self.var).max(0.0)
    }

    /// VaR as a percentage of the initial value.
    pub fn var_pct(&self) -> f64 {
        if self.initial_value == 0.0 {
            0.0
        } else {
            self.var / self.initial_value * 100.0
        }
    }

    /// Generate summary report.
    pub fn summary(&self) -> String {
        format!(
            r#"Monte Carlo Value at Risk
=========================
Simulations: {}
Horizon: {} days
Positions: {}
Initial Value: {:.2}

Outcome (gain/loss):
  Mean: {:.2}
  Median: {:.2}
  Std Dev: {:.2}
  P(Loss): {:.1}%

Risk:
  VaR ({}%): {:.2} ({:.2}%)
  Expected Shortfall: {:.2}"#,
            self.num_simulations,
            self.days,
            self.num_positions,
            self.initial_value,
            self.mean_gain,
            self.median_gain,
            self.std_gain,
            self.prob_loss * 100.0,
            self.percentile * 100.0,
            self.var,
            self.var_pct(),
            self.expected_shortfall,
        )
    }
}

/// Runs seeded simulations in parallel and aggregates their outcomes.
pub struct VarSimulator {
    config: VarConfig,
}

impl VarSimulator {
    pub fn new(config: VarConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VarConfig {
        &self.config
    }

    /// Estimate value-at-risk for `portfolio`.
    pub fn run(&self, portfolio: &Portfolio, params: &DistributionMap) -> Result<VarReport> {
        self.config.validate()?;
        let master_seed = self.config.seed.unwrap_or_else(rand::random);
        let seeds = generate_seeds(self.config.num_simulations, master_seed);
        let gains = self.simulate_gains(portfolio, params, &seeds)?;
        VarReport::from_gains(
            &self.config,
            master_seed,
            portfolio.len(),
            portfolio.total_value(),
            gains,
        )
    }

    /// Run one simulation per seed and return each run's gain, in seed order.
    ///
    /// The portfolio and parameters are shared read-only across workers; each
    /// run works on its own copy. The first failing run fails the whole batch.
    pub fn simulate_gains(
        &self,
        portfolio: &Portfolio,
        params: &DistributionMap,
        seeds: &[u64],
    ) -> Result<Vec<f64>> {
        if portfolio.is_empty() {
            return Err(VarError::InvalidInput(
                "Cannot simulate an empty portfolio".to_string(),
            ));
        }

        let initial_value = portfolio.total_value();
        let days = self.config.days;
        info!(
            "Running {} simulations of {} days over {} positions",
            seeds.len(),
            days,
            portfolio.len()
        );

        let progress = if self.config.show_progress {
            let pb = ProgressBar::new(seeds.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                    .map_err(|e| VarError::ConfigError(e.to_string()))?
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let gains = seeds
            .par_iter()
            .map(|&seed| {
                let outcome = simulate(portfolio, params, days, seed)?;
                if let Some(pb) = &progress {
                    pb.inc(1);
                }
                Ok(outcome.total_value() - initial_value)
            })
            .collect::<Result<Vec<f64>>>();

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let gains = gains?;
        debug!("Collected {} simulation outcomes", gains.len());
        Ok(gains)
    }
}
