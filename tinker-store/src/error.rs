//! Store Error Types

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error type for store operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Key cannot be mapped onto the backend
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// Stored bytes are not valid UTF-8
    #[error("Value for '{key}' is not valid UTF-8")]
    Corrupt { key: String },

    #[error("IO error: {message}")]
    Io { message: String },

    /// Internal state unusable (poisoned lock)
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io {
            message: err.to_string(),
        }
    }
}
