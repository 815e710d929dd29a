//! Durable channel error types.

use thiserror::Error;

/// Errors raised by channel backends and the connection lifecycle.
#[derive(Error, Debug, Clone)]
pub enum ChannelError {
    /// Could not establish or verify a connection to the broker.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The broker did not confirm a durable write.
    #[error("Publish error: {0}")]
    PublishError(String),

    /// Failed to receive the next message.
    #[error("Fetch error: {0}")]
    FetchError(String),

    /// Failed to acknowledge or reject a delivery.
    #[error("Acknowledge error: {0}")]
    AcknowledgeError(String),

    /// A fetch was attempted while a delivery is still unacknowledged.
    #[error("Prefetch limit exceeded: delivery {0} is still in flight")]
    PrefetchExceeded(i64),

    /// The acknowledged delivery is not the one in flight.
    #[error("Unknown delivery: {0}")]
    UnknownDelivery(i64),

    /// The channel has been closed.
    #[error("Channel closed")]
    Closed,
}

impl ChannelError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a publish error.
    pub fn publish(msg: impl Into<String>) -> Self {
        Self::PublishError(msg.into())
    }

    /// Create a fetch error.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::FetchError(msg.into())
    }

    /// Create an acknowledge error.
    pub fn acknowledge(msg: impl Into<String>) -> Self {
        Self::AcknowledgeError(msg.into())
    }

    /// Whether the failure means the transport itself is gone.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::ConnectionError(_) | Self::Closed)
    }
}

impl From<rdkafka::error::KafkaError> for ChannelError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::ConnectionError(err.to_string())
    }
}
