//! Error types for the trial spawner core library.
//!
//! Only setup and persistence paths are fallible. The per-tick path never
//! returns errors: refusals are `None`/empty results and invariant violations
//! are clamped and logged.

use thiserror::Error;

/// Top-level error type for all fallible trial spawner operations.
#[derive(Error, Debug)]
pub enum TrialError {
    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration parsed but a field holds an unusable value.
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, TrialError>;
