//! Error types for bedrock-kv
//!
//! Provides a unified error type for all facade operations.

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Boxed engine error, passed through without modification
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for bedrock-kv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    /// Empty key, or an empty (non-`None`) iterator bound
    #[error("key cannot be empty")]
    InvalidKey,

    /// Nil value supplied to a write
    #[error("value cannot be nil")]
    InvalidValue,

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    #[error("storage error: {0}")]
    Storage(#[source] BoxError),

    #[error("database is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),
}

impl KvError {
    /// Wrap an engine failure
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        KvError::Storage(Box::new(err))
    }

    /// True for `InvalidKey` and `InvalidValue`, which indicate a bad call site
    pub fn is_validation(&self) -> bool {
        matches!(self, KvError::InvalidKey | KvError::InvalidValue)
    }
}
