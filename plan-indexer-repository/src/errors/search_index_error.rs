//! Search index error types.
//!
//! Per-document failures are carried inside a `BatchOperationSummary`, so the
//! error is `Clone`.

use thiserror::Error;

/// Errors that can occur during search index operations.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g., missing document id).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to establish connection to the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The engine rejected a document write.
    #[error("Index error: {0}")]
    IndexError(String),

    /// The engine rejected a delete. A missing document is not an error.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Failed to create the index with its join mapping.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Batch size exceeds configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create a delete error.
    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }
}
