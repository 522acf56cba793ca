//! Structured error types for lhd-store.
//!
//! Driver errors are wrapped with their source intact so callers can
//! inspect them. "Not found" is never an error here: lookups return
//! `Option`.

use thiserror::Error;

/// Main error type for lhd-store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Opening or verifying the client failed
    #[error("Connection to {uri} failed: {source}")]
    Connection {
        uri: String,
        #[source]
        source: mongodb::error::Error,
    },

    /// Query or write failed inside the driver
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    /// A report id that is not a valid ObjectId
    #[error("Invalid report id '{id}'")]
    InvalidId { id: String },

    /// A stored document is missing a field or has the wrong type
    #[error("Malformed document: field '{field}' {reason}")]
    Malformed { field: &'static str, reason: String },

    /// Raw payload could not be serialized
    #[error("Failed to serialize raw payload: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

/// Result type alias for lhd-store operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Create a connection error for `uri`
    pub fn connection(uri: impl Into<String>, source: mongodb::error::Error) -> Self {
        Self::Connection {
            uri: uri.into(),
            source,
        }
    }

    /// Create an invalid id error
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId { id: id.into() }
    }

    /// Create a malformed document error
    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            field,
            reason: reason.into(),
        }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}
