//! Configuration file support for value-at-risk runs.
//!
//! Allows loading run configurations from TOML files for reproducibility.

use crate::data::DataConfig;
use crate::error::{Result, VarError};
use crate::monte_carlo::VarConfig;
use crate::portfolio::ShareCountRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Complete run configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VarFileConfig {
    /// Price history settings.
    #[serde(default)]
    pub data: DataSettings,
    /// Portfolio settings.
    #[serde(default)]
    pub portfolio: PortfolioSettings,
    /// Simulation settings.
    #[serde(default)]
    pub simulation: SimulationSettings,
}

/// Price history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// Path to the price file (CSV or Parquet).
    pub path: Option<String>,
    /// Date format in the file.
    pub date_format: Option<String>,
    /// CSV delimiter. Auto-detected when unset.
    pub delimiter: Option<char>,
    /// Skip unparseable rows.
    #[serde(default = "default_true")]
    pub skip_invalid: bool,
}

fn default_true() -> bool { true }

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            path: None,
            date_format: None,
            delimiter: None,
            skip_invalid: true,
        }
    }
}

/// Portfolio settings.
///
/// When `positions` is empty a random portfolio is drawn from the latest
/// prices using the share count range and seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSettings {
    /// Seed for the random share counts.
    #[serde(default = "default_portfolio_seed")]
    pub seed: u64,
    #[serde(default)]
    pub min_shares: u64,
    #[serde(default = "default_max_shares")]
    pub max_shares: u64,
    /// Explicit dollar positions by ticker.
    #[serde(default)]
    pub positions: BTreeMap<String, f64>,
}

fn default_portfolio_seed() -> u64 { 42 }
fn default_max_shares() -> u64 { 1000 }

impl Default for PortfolioSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            min_shares: 0,
            max_shares: 1000,
            positions: BTreeMap::new(),
        }
    }
}

/// Simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_simulations")]
    pub num_simulations: usize,
    #[serde(default = "default_days")]
    pub days: usize,
    /// Percentile as a fraction (0.05 = 5%).
    #[serde(default = "default_percentile")]
    pub percentile: f64,
    /// Master seed; random when unset.
    pub seed: Option<u64>,
    #[serde(default)]
    pub show_progress: bool,
}

fn default_simulations() -> usize { 10_000 }
fn default_days() -> usize { 5 }
fn default_percentile() -> f64 { 0.05 }

impl Default for SimulationSettings {
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

impl VarFileConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path)?;
        let config: VarFileConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| VarError::ConfigError(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert to the simulator configuration.
    pub fn to_var_config(&self) -> Result<VarConfig> {
        let config = VarConfig {
            num_simulations: self.simulation.num_simulations,
            days: self.simulation.days,
            percentile: self.simulation.percentile,
            seed: self.simulation.seed,
            show_progress: self.simulation.show_progress,
        };
        config.validate()?;
        Ok(config)
    }

    /// Convert to the loader configuration.
    pub fn to_data_config(&self) -> Result<DataConfig> {
        let delimiter = match self.data.delimiter {
            Some(c) if c.is_ascii() => Some(c as u8),
            Some(c) => {
                return Err(VarError::ConfigError(format!(
                    "Delimiter must be a single ASCII character, got {:?}",
                    c
                )))
            }
            None => None,
        };

        Ok(DataConfig {
            date_format: self.data.date_format.clone(),
            delimiter,
            skip_invalid: self.data.skip_invalid,
            ..Default::default()
        })
    }

    pub fn share_range(&self) -> Result<ShareCountRange> {
        ShareCountRange::new(self.portfolio.min_shares, self.portfolio.max_shares)
    }

    /// Generate an example configuration file content.
    pub fn example() -> String {
        r#"# Monte Carlo VaR Configuration File

[data]
path = "data/prices.parquet"
# date_format = "%Y-%m-%d"
# delimiter = ","

[portfolio]
# Random portfolio: price * uniform share count in [min_shares, max_shares]
seed = 42
min_shares = 0
max_shares = 1000

# Explicit positions (dollar value per ticker) replace the random portfolio:
# [portfolio.positions]
# AAPL = 250000.0
# MSFT = 250000.0

[simulation]
num_simulations = 10000
days = 5
percentile = 0.05   # 5%
# seed = 1234
show_progress = true
"#
        .to_string()
    }
}
