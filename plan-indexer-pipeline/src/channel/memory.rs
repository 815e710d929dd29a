//! In-process channel backend.
//!
//! A FIFO queue with a single in-flight slot. Used by tests and by embedded
//! deployments that run the write path and the consumer in one process.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::channel::{Connector, Delivery, DeliveryTag, EnvelopeSink, EnvelopeSource};
use crate::errors::ChannelError;
use plan_indexer_shared::Operation;

#[derive(Debug, Default)]
struct QueueState {
    queue: VecDeque<Delivery>,
    in_flight: Option<Delivery>,
    next_offset: i64,
    acked: u64,
    discarded: u64,
    closed: bool,
    unreachable: bool,
}

/// In-memory durable channel.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages waiting to be fetched, excluding the in-flight one.
    pub async fn pending(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    pub async fn has_in_flight(&self) -> bool {
        self.state.lock().await.in_flight.is_some()
    }

    /// Number of acknowledged deliveries.
    pub async fn acked(&self) -> u64 {
        self.state.lock().await.acked
    }

    /// Number of deliveries rejected without requeue.
    pub async fn discarded(&self) -> u64 {
        self.state.lock().await.discarded
    }

    /// Return the unsettled delivery to the head of the queue, as a broker
    /// does when a consumer disconnects.
    pub async fn recover(&self) -> bool {
        let mut state = self.state.lock().await;
        match state.in_flight.take() {
            Some(delivery) => {
                debug!(offset = delivery.tag.offset, "Requeueing unsettled delivery");
                state.queue.push_front(delivery);
                drop(state);
                self.notify.notify_one();
                true
            }
            None => false,
        }
    }

    /// Make sends fail as if the broker could not be reached.
    pub async fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().await.unreachable = unreachable;
    }

    /// Close the channel. Pending fetches return `None` once the queue drains.
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    async fn settle(&self, tag: DeliveryTag, acked: bool) -> Result<(), ChannelError> {
        let mut state = self.state.lock().await;
        match &state.in_flight {
            Some(delivery) if delivery.tag == tag => {
                state.in_flight = None;
                if acked {
                    state.acked += 1;
                } else {
                    state.discarded += 1;
                }
                Ok(())
            }
            _ => Err(ChannelError::UnknownDelivery(tag.offset)),
        }
    }
}

#[async_trait]
impl EnvelopeSink for MemoryChannel {
    async fn send(
        &self,
        key: Option<&str>,
        payload: &[u8],
        operation: Operation,
    ) -> Result<bool, ChannelError> {
        let mut state = self.state.lock().await;
        if state.unreachable {
            return Err(ChannelError::connection("memory channel is unreachable"));
        }
        if state.closed {
            return Err(ChannelError::Closed);
        }

        let offset = state.next_offset;
        state.next_offset += 1;
        state.queue.push_back(Delivery {
            tag: DeliveryTag {
                partition: 0,
                offset,
            },
            payload: payload.to_vec(),
        });
        drop(state);

        debug!(key = ?key, operation = %operation, offset = offset, "Queued envelope");
        self.notify.notify_one();
        Ok(true)
    }
}

#[async_trait]
impl EnvelopeSource for MemoryChannel {
    async fn fetch(&self) -> Result<Option<Delivery>, ChannelError> {
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(delivery) = &state.in_flight {
                    return Err(ChannelError::PrefetchExceeded(delivery.tag.offset));
                }
                if let Some(delivery) = state.queue.pop_front() {
                    state.in_flight = Some(delivery.clone());
                    return Ok(Some(delivery));
                }
                if state.closed {
                    return Ok(None);
                }
            }
            self.notify.notified().await;
        }
    }

    async fn ack(&self, tag: DeliveryTag) -> Result<(), ChannelError> {
        self.settle(tag, true).await
    }

    async fn nack(&self, tag: DeliveryTag) -> Result<(), ChannelError> {
        self.settle(tag, false).await
    }
}

/// Hands out a shared [`MemoryChannel`]; reconnecting yields the same queue.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    channel: Arc<MemoryChannel>,
}

impl MemoryConnector {
    pub fn new(channel: Arc<MemoryChannel>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Channel = MemoryChannel;

    async fn connect(&self) -> Result<Arc<MemoryChannel>, ChannelError> {
        Ok(self.channel.clone())
    }
}
