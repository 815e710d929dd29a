//! Primary store error types.

use thiserror::Error;

/// Errors raised by a [`KeyValueStore`](crate::interfaces::KeyValueStore).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store could not be reached or rejected the command.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A key pattern could not be parsed.
    #[error("Invalid key pattern: {0}")]
    InvalidPattern(String),
}

impl StoreError {
    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }
}
