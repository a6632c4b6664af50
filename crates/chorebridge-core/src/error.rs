//! Core error types for chorebridge-core.
//!
//! Malformed input (URLs, JSON, dates, markup) is absorbed where it is read
//! and never shows up here. These types cover the failures a host can act
//! on: reminder-store operations, configuration, and the bridge channel.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for chorebridge-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Reminder store errors
    #[error("Reminder store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Bridge channel errors
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Failures reported by a [`ReminderStore`](crate::reminder::ReminderStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The platform refused to post or schedule notifications.
    #[error("Notification permission denied")]
    PermissionDenied,

    /// The platform refused to schedule more alarms.
    #[error("Alarm quota exceeded")]
    QuotaExceeded,

    /// Failed to open the durable store
    #[error("Failed to open reminder store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Reminder store migration failed: {0}")]
    MigrationFailed(String),

    /// Any other backend failure
    #[error("{0}")]
    Backend(String),
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

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Could not resolve the configuration directory
    #[error("Cannot resolve data directory: {0}")]
    DataDir(String),
}

/// Errors crossing the script-to-native boundary.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The worker behind the bridge has stopped.
    #[error("bridge worker is not running")]
    Closed,

    /// A raw script message could not be decoded.
    #[error("malformed bridge message: {0}")]
    MalformedEnvelope(String),

    /// The worker task panicked or was aborted.
    #[error("bridge worker failed: {0}")]
    WorkerFailed(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::QueryFailed(err.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
