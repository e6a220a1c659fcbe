//! Error types for the simulation engine.

use thiserror::Error;

/// Main error type for simulation operations.
///
/// Validation errors are fatal to a run: no partial ledger is produced.
/// Insolvency (mark-to-market total falling to zero or below) is a normal
/// termination, not an error, and never surfaces here.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Missing value for {symbol} at period {period}")]
    MissingValue { symbol: String, period: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Optimization error: {0}")]
    OptimizationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
