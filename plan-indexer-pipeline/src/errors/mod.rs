//! Error types for the plan indexer pipeline.

mod channel_error;

pub use channel_error::ChannelError;

use plan_indexer_repository::SearchIndexError;
use plan_indexer_shared::EntityError;
use thiserror::Error;

/// Errors that can occur in the replication pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The entity is malformed; raised before merge or publish.
    #[error("Validation failure: {0}")]
    ValidationFailure(String),

    /// The caller's concurrency token does not match the stored entity.
    #[error("Precondition failed: expected {expected}, current {current}")]
    PreconditionFailed { expected: String, current: String },

    /// The durable channel could not take the envelope.
    #[error("Channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// Applying an envelope to the search index failed.
    #[error("Index dispatch failure: {0}")]
    IndexDispatchFailure(String),

    /// Channel-side failure on the consumer path (fetch, ack, nack).
    #[error("Channel error: {0}")]
    ChannelError(#[from] ChannelError),

    /// Error parsing or decoding an envelope.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Error serializing an envelope or entity.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PipelineError {
    /// Create a validation failure.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailure(msg.into())
    }

    /// Create a precondition failure.
    pub fn precondition_failed(expected: impl Into<String>, current: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            expected: expected.into(),
            current: current.into(),
        }
    }

    /// Create a channel unavailable error.
    pub fn channel_unavailable(msg: impl Into<String>) -> Self {
        Self::ChannelUnavailable(msg.into())
    }

    /// Create an index dispatch failure.
    pub fn index_dispatch(msg: impl Into<String>) -> Self {
        Self::IndexDispatchFailure(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}

impl From<SearchIndexError> for PipelineError {
    fn from(err: SearchIndexError) -> Self {
        Self::IndexDispatchFailure(err.to_string())
    }
}

impl From<EntityError> for PipelineError {
    fn from(err: EntityError) -> Self {
        Self::ValidationFailure(err.to_string())
    }
}
