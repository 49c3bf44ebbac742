//! Error types for the peptide_core library.
//!
//! The dose engine never returns these: invalid calculator input is a normal
//! `None` result. They cover the store, config, tables and order builder.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for peptide_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Static reference table inconsistency
    #[error("Reference table error: {0}")]
    Tables(String),

    /// Purchase order builder rejected an edit
    #[error("Order error: {0}")]
    Order(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
