//! Durable channel between the write path and the index consumer.
//!
//! Envelopes are opaque bytes here. The publisher writes them through an
//! [`EnvelopeSink`], the consumer reads them from an [`EnvelopeSource`] one at
//! a time and settles each delivery with `ack` or `nack` before fetching the
//! next.

mod connection;
mod kafka;
mod memory;

pub use connection::{ChannelConnection, ConnectionState, Connector, ReconnectPolicy};
pub use kafka::{KafkaConfig, KafkaSink, KafkaSinkConnector, KafkaSource, KafkaSourceConnector};
pub use memory::{MemoryChannel, MemoryConnector};

use async_trait::async_trait;

use crate::errors::ChannelError;
use plan_indexer_shared::Operation;

/// Broker position of a delivery, used to settle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryTag {
    pub partition: i32,
    pub offset: i64,
}

/// A message handed to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub tag: DeliveryTag,
    pub payload: Vec<u8>,
}

/// Publisher side of the channel.
#[async_trait]
pub trait EnvelopeSink: Send + Sync {
    /// Write one message durably.
    ///
    /// Returns once the broker has confirmed the write. `key` groups messages
    /// of the same entity.
    async fn send(
        &self,
        key: Option<&str>,
        payload: &[u8],
        operation: Operation,
    ) -> Result<bool, ChannelError>;
}

/// Consumer side of the channel. At most one delivery is in flight.
#[async_trait]
pub trait EnvelopeSource: Send + Sync {
    /// Wait for the next message. `None` means the channel was closed.
    async fn fetch(&self) -> Result<Option<Delivery>, ChannelError>;

    /// Settle a delivery as processed; it is never delivered again.
    async fn ack(&self, tag: DeliveryTag) -> Result<(), ChannelError>;

    /// Reject a delivery without requeue; it is discarded.
    async fn nack(&self, tag: DeliveryTag) -> Result<(), ChannelError>;
}
