//! mcvar - Monte Carlo value-at-risk over historical security returns.
//!
//! # Overview
//!
//! mcvar estimates how much a portfolio could lose over a short horizon by
//! simulating many random walks of its positions:
//!
//! - **Return statistics**: per-security mean and standard deviation of daily
//!   percent price changes, estimated from a CSV or Parquet price history
//! - **Portfolios**: random demonstration portfolios or explicit positions
//! - **Seeded simulation**: every run is a deterministic function of its seed
//! - **Parallel aggregation**: runs are spread across threads with rayon and
//!   their gains sorted to read off the value-at-risk percentile
//!
//! # Quick Start
//!
//! ```no_run
//! use mcvar::data::{daily_returns, latest_prices, load_prices, DataConfig};
//! use mcvar::monte_carlo::{VarConfig, VarSimulator};
//! use mcvar::portfolio::{random_portfolio, ShareCountRange};
//! use mcvar::stats::estimate_distributions;
//!
//! let prices = load_prices("data/prices.parquet", &DataConfig::default()).unwrap();
//! let params = estimate_distributions(&daily_returns(&prices));
//! let portfolio =
//!     random_portfolio(&latest_prices(&prices), &ShareCountRange::default(), 42).unwrap();
//!
//! let config = VarConfig::default().with_days(5).with_percentile(0.05).with_seed(7);
//! let report = VarSimulator::new(config).run(&portfolio, &params).unwrap();
//! println!("5-day 5% VaR: {:.2}", report.var);
//! ```
//!
//! # Modules
//!
//! - [`types`]: Price and return records, distribution parameters, portfolios
//! - [`data`]: Price loading (CSV, Parquet) and daily return derivation
//! - [`stats`]: Per-ticker distribution estimation
//! - [`portfolio`]: Random portfolio construction
//! - [`simulation`]: Single-day step and multi-day seeded driver
//! - [`monte_carlo`]: Parallel aggregation and value-at-risk report
//! - [`config`]: TOML configuration file support
//! - [`report`]: Text, JSON and CSV formatting
//! - [`export`]: File export of outcomes, paths and prices

pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod monte_carlo;
pub mod portfolio;
pub mod report;
pub mod simulation;
pub mod stats;
pub mod types;

pub use error::{Result, VarError};
pub use monte_carlo::{VarConfig, VarReport, VarSimulator};
pub use portfolio::{random_portfolio, ShareCountRange};
pub use simulation::{simulate, simulate_step, simulate_with_history, SimulationPath};
pub use stats::estimate_distributions;
pub use types::{DistributionMap, DistributionParams, Portfolio, PriceRecord, ReturnRecord};
