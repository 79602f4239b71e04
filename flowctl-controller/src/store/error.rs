//! Store error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the key-value store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or rejected the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The request did not complete within its timeout.
    #[error("store request on {key:?} timed out after {timeout:?}")]
    Timeout { key: String, timeout: Duration },

    /// The stored bytes under `key` are not a readable value.
    #[error("corrupt value under {key:?}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
