//! Sequential envelope consumer.
//!
//! Fetches one envelope, applies it to the search index, and settles it
//! before fetching the next, so index writes happen in publish order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::channel::{Delivery, EnvelopeSource};
use crate::errors::{ChannelError, PipelineError};
use crate::loader::IndexLoader;
use plan_indexer_repository::BatchOperationSummary;
use plan_indexer_shared::OperationEnvelope;

/// Where the consumer is in its fetch/process/settle cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Idle,
    Fetching,
    Processing,
    Acking,
    Nacking,
}

/// How one delivery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Applied and acknowledged.
    Acked,
    /// Dispatch failed; rejected without requeue.
    Discarded,
    /// The channel was closed; nothing was fetched.
    Closed,
}

/// Counters reported when the consumer stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub acked: u64,
    pub discarded: u64,
}

/// Applies envelopes from the channel to the search index, one at a time.
///
/// There is no timeout on dispatch: a hung index call stalls the consumer.
pub struct ChangeConsumer {
    source: Arc<dyn EnvelopeSource>,
    loader: Arc<IndexLoader>,
    fetch_retry_delay: Duration,
    state: watch::Sender<ConsumerState>,
    acked: AtomicU64,
    discarded: AtomicU64,
}

impl ChangeConsumer {
    pub fn new(source: Arc<dyn EnvelopeSource>, loader: Arc<IndexLoader>) -> Self {
        let (state, _) = watch::channel(ConsumerState::Idle);
        Self {
            source,
            loader,
            fetch_retry_delay: Duration::from_secs(1),
            state,
            acked: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Pause between fetch attempts after a fetch failure.
    pub fn with_fetch_retry_delay(mut self, delay: Duration) -> Self {
        self.fetch_retry_delay = delay;
        self
    }

    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> ConsumerStats {
        ConsumerStats {
            acked: self.acked.load(Ordering::SeqCst),
            discarded: self.discarded.load(Ordering::SeqCst),
        }
    }

    /// Fetch, apply and settle a single envelope.
    pub async fn run_once(&self) -> Result<Settlement, PipelineError> {
        self.transition(ConsumerState::Fetching);
        match self.source.fetch().await {
            Ok(Some(delivery)) => self.handle(delivery).await,
            Ok(None) => {
                self.transition(ConsumerState::Idle);
                Ok(Settlement::Closed)
            }
            Err(e) => {
                self.transition(ConsumerState::Idle);
                Err(e.into())
            }
        }
    }

    /// Consume until shutdown is signalled or the channel closes.
    ///
    /// Shutdown only interrupts a pending fetch; an envelope already fetched
    /// is always applied and settled first. A failed ack or nack stops the
    /// consumer, leaving the delivery to be redelivered after a restart.
    #[instrument(skip(self, shutdown))]
    pub async fn run(
        &self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<ConsumerStats, PipelineError> {
        info!("Consumer started");

        loop {
            self.transition(ConsumerState::Fetching);
            let fetched = tokio::select! {
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal");
                    break;
                }
                fetched = self.source.fetch() => fetched,
            };

            match fetched {
                Ok(Some(delivery)) => {
                    self.handle(delivery).await?;
                }
                Ok(None) => {
                    info!("Channel closed");
                    break;
                }
                Err(ChannelError::PrefetchExceeded(offset)) => {
                    self.transition(ConsumerState::Idle);
                    return Err(ChannelError::PrefetchExceeded(offset).into());
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        retry_in_ms = self.fetch_retry_delay.as_millis() as u64,
                        "Fetch failed"
                    );
                    tokio::select! {
                        _ = shutdown.recv() => {
                            info!("Consumer received shutdown signal");
                            break;
                        }
                        _ = tokio::time::sleep(self.fetch_retry_delay) => {}
                    }
                }
            }
        }

        self.transition(ConsumerState::Idle);
        let stats = self.stats();
        info!(acked = stats.acked, discarded = stats.discarded, "Consumer stopped");
        Ok(stats)
    }

    async fn handle(&self, delivery: Delivery) -> Result<Settlement, PipelineError> {
        let tag = delivery.tag;
        self.transition(ConsumerState::Processing);

        let settled = match self.dispatch(&delivery.payload).await {
            Ok(summary) => {
                self.transition(ConsumerState::Acking);
                self.source.ack(tag).await.map(|()| {
                    self.acked.fetch_add(1, Ordering::SeqCst);
                    debug!(
                        partition = tag.partition,
                        offset = tag.offset,
                        documents = summary.total,
                        "Envelope applied"
                    );
                    Settlement::Acked
                })
            }
            Err(e) => {
                error!(
                    partition = tag.partition,
                    offset = tag.offset,
                    error = %e,
                    "Envelope dispatch failed, discarding"
                );
                self.transition(ConsumerState::Nacking);
                self.source.nack(tag).await.map(|()| {
                    self.discarded.fetch_add(1, Ordering::SeqCst);
                    Settlement::Discarded
                })
            }
        };

        // Settle failures still end the cycle.
        self.transition(ConsumerState::Idle);
        Ok(settled?)
    }

    async fn dispatch(&self, payload: &[u8]) -> Result<BatchOperationSummary, PipelineError> {
        let envelope = OperationEnvelope::from_bytes(payload)
            .map_err(|e| PipelineError::parse(format!("Failed to decode envelope: {}", e)))?;
        self.loader.apply(&envelope).await
    }

    fn transition(&self, next: ConsumerState) {
        self.state.send_replace(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{EnvelopeSink, MemoryChannel};
    use crate::publisher::ChangePublisher;
    use crate::channel::DeliveryTag;
    use crate::test_fixtures::{small_plan, RecordingProvider};
    use async_trait::async_trait;
    use plan_indexer_shared::Operation;

    /// Delivers from a memory channel but refuses every settlement.
    struct UnsettleableSource {
        inner: Arc<MemoryChannel>,
    }

    #[async_trait]
    impl EnvelopeSource for UnsettleableSource {
        async fn fetch(&self) -> Result<Option<Delivery>, ChannelError> {
            self.inner.fetch().await
        }

        async fn ack(&self, _tag: DeliveryTag) -> Result<(), ChannelError> {
            Err(ChannelError::acknowledge("commit rejected"))
        }

        async fn nack(&self, _tag: DeliveryTag) -> Result<(), ChannelError> {
            Err(ChannelError::acknowledge("commit rejected"))
        }
    }

    fn consumer_over(channel: &Arc<MemoryChannel>, provider: &RecordingProvider) -> ChangeConsumer {
        let loader = Arc::new(IndexLoader::new(provider.client()));
        ChangeConsumer::new(channel.clone(), loader)
    }

    #[tokio::test]
    async fn test_applied_envelope_is_acked() {
        let channel = Arc::new(MemoryChannel::new());
        let provider = RecordingProvider::new();
        let consumer = consumer_over(&channel, &provider);
        ChangePublisher::new(channel.clone())
            .publish(Operation::Create, &small_plan("p1"))
            .await
            .unwrap();

        let settlement = consumer.run_once().await.unwrap();

        assert_eq!(settlement, Settlement::Acked);
        assert_eq!(consumer.state(), ConsumerState::Idle);
        assert_eq!(channel.acked().await, 1);
        assert_eq!(provider.indexed_ids().len(), 4);
    }

    #[tokio::test]
    async fn test_failed_dispatch_is_discarded() {
        let channel = Arc::new(MemoryChannel::new());
        let provider = RecordingProvider::new();
        provider.fail_on("p1-s2");
        let consumer = consumer_over(&channel, &provider);
        let publisher = ChangePublisher::new(channel.clone());
        publisher.publish(Operation::Create, &small_plan("p1")).await.unwrap();
        publisher.publish(Operation::Create, &small_plan("p2")).await.unwrap();

        assert_eq!(consumer.run_once().await.unwrap(), Settlement::Discarded);
        assert_eq!(consumer.run_once().await.unwrap(), Settlement::Acked);

        assert_eq!(channel.discarded().await, 1);
        assert_eq!(channel.acked().await, 1);
        assert!(!channel.recover().await);
        assert_eq!(
            consumer.stats(),
            ConsumerStats {
                acked: 1,
                discarded: 1
            }
        );
    }

    #[tokio::test]
    async fn test_undecodable_envelope_is_discarded() {
        let channel = Arc::new(MemoryChannel::new());
        let provider = RecordingProvider::new();
        let consumer = consumer_over(&channel, &provider);
        channel
            .send(None, br#"{"operation":"MERGE","payload":{},"timestamp":"2024-01-01T00:00:00Z"}"#, Operation::Create)
            .await
            .unwrap();

        assert_eq!(consumer.run_once().await.unwrap(), Settlement::Discarded);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_close() {
        let channel = Arc::new(MemoryChannel::new());
        let provider = RecordingProvider::new();
        let consumer = consumer_over(&channel, &provider);
        let publisher = ChangePublisher::new(channel.clone());
        for id in ["a", "b", "c"] {
            publisher.publish(Operation::Create, &small_plan(id)).await.unwrap();
        }
        channel.close().await;

        let (_tx, rx) = broadcast::channel(1);
        let stats = consumer.run(rx).await.unwrap();

        assert_eq!(stats.acked, 3);
        assert_eq!(consumer.state(), ConsumerState::Idle);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_idle_fetch() {
        let channel = Arc::new(MemoryChannel::new());
        let provider = RecordingProvider::new();
        let consumer = Arc::new(consumer_over(&channel, &provider));
        let (tx, rx) = broadcast::channel(1);

        let handle = {
            let consumer = consumer.clone();
            tokio::spawn(async move { consumer.run(rx).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send(()).unwrap();

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats, ConsumerStats::default());
    }

    #[tokio::test]
    async fn test_closed_channel_settlement() {
        let channel = Arc::new(MemoryChannel::new());
        channel.close().await;
        let consumer = consumer_over(&channel, &RecordingProvider::new());

        assert_eq!(consumer.run_once().await.unwrap(), Settlement::Closed);
    }

    #[tokio::test]
    async fn test_failed_settlement_returns_to_idle() {
        let provider = RecordingProvider::new();
        provider.fail_on("p2-s1");

        // p1 is applied, so the ack path runs; p2 fails, so the nack path runs.
        for id in ["p1", "p2"] {
            let channel = Arc::new(MemoryChannel::new());
            ChangePublisher::new(channel.clone())
                .publish(Operation::Create, &small_plan(id))
                .await
                .unwrap();
            let source = Arc::new(UnsettleableSource { inner: channel });
            let consumer =
                ChangeConsumer::new(source, Arc::new(IndexLoader::new(provider.client())));
            let states = consumer.subscribe();

            let result = consumer.run_once().await;

            assert!(matches!(result, Err(PipelineError::ChannelError(_))));
            assert_eq!(*states.borrow(), ConsumerState::Idle);
            assert_eq!(consumer.stats(), ConsumerStats::default());
        }
    }
}
