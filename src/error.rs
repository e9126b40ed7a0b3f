//! Error types for the value-at-risk simulator.

use thiserror::Error;

/// Main error type for loading, estimating and simulating.
#[derive(Error, Debug)]
pub enum VarError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("No data loaded")]
    NoData,

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No distribution parameters for ticker: {ticker}")]
    MissingParameters { ticker: String },

    #[error("Invalid return distribution for {ticker}: mean {mean}, std dev {std_dev}")]
    InvalidDistribution {
        ticker: String,
        mean: f64,
        std_dev: f64,
    },
}

/// Result type alias for simulator operations.
pub type Result<T> = std::result::Result<T, VarError>;
