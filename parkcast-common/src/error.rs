//! Common error types for parkcast

use thiserror::Error;

/// Common result type for parkcast operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across parkcast crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading error (metadata tables, static snapshots)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
