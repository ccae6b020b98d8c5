//! Error types for the cascade engine
//!
//! ## Table of Contents
//! - **CascadeError**: Main error enum covering all failure modes
//! - **Result**: Type alias for `Result<T, CascadeError>`

use thiserror::Error;

/// Result type alias for cascade operations
pub type Result<T> = std::result::Result<T, CascadeError>;

/// Main error type for cascade operations
#[derive(Error, Debug)]
pub enum CascadeError {
    /// Configuration error during builder setup
    #[error("configuration error: {0}")]
    Config(String),

    /// Uniqueness violation (duplicate airport code)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Referenced airport or flight does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Flight schedule violates `departure_time < arrival_time`
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// No alternative airport available for a diversion
    #[error("no alternative airport: {0}")]
    NoAlternative(String),

    /// Storage backend failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Networking failure (HTTP surface, push gateway)
    #[error("network error: {0}")]
    Network(String),

    /// Metrics collection or export failure
    #[error("metrics error: {0}")]
    Metrics(String),

    /// Engine not initialized or already stopped
    #[error("runtime error: {0}")]
    Runtime(String),

    /// Generic IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error (should not occur in normal operation)
    #[error("internal error: {0}")]
    Internal(String),
}

impl CascadeError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid-schedule error
    pub fn invalid_schedule(msg: impl Into<String>) -> Self {
        Self::InvalidSchedule(msg.into())
    }

    /// Create a no-alternative error
    pub fn no_alternative(msg: impl Into<String>) -> Self {
        Self::NoAlternative(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a metrics error
    pub fn metrics(msg: impl Into<String>) -> Self {
        Self::Metrics(msg.into())
    }

    /// Create a runtime error
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }
}

impl From<prometheus::Error> for CascadeError {
    fn from(err: prometheus::Error) -> Self {
        Self::Metrics(err.to_string())
    }
}
