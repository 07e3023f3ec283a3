//! Core error types for agenda-core.
//!
//! This module defines the error hierarchy using thiserror. The reminder
//! timer never surfaces these to the end user; they are logged and the
//! offending event is skipped.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for agenda-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Event store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Event store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the data file failed
    #[error("Failed to access event file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The data file is not valid JSON for the event document
    #[error("Malformed event file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No event with the given id
    #[error("Event not found: {0}")]
    NotFound(String),

    /// The event data was rejected
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be created
    #[error("Data directory unavailable at {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Title is empty or whitespace
    #[error("Event title is required")]
    EmptyTitle,

    /// Date is not `YYYY-MM-DD`
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Time is not `HH:MM`
    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    /// Date is too far in the future
    #[error("Date {0} is more than 10 years in the future")]
    TooFarAhead(chrono::NaiveDate),

    /// Date is too far in the past
    #[error("Date {0} is more than 100 years in the past")]
    TooFarBehind(chrono::NaiveDate),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
