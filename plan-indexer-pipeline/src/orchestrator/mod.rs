//! Orchestrator module for the plan indexer pipeline.
//!
//! Prepares the search index and runs the consumer until shutdown.

use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, instrument};

use crate::channel::EnvelopeSource;
use crate::consumer::{ChangeConsumer, ConsumerStats};
use crate::errors::PipelineError;
use crate::loader::IndexLoader;

/// Runs the index side of the pipeline.
///
/// The orchestrator:
/// - Ensures the search index and its join mapping exist
/// - Runs the consumer on the current task
/// - Turns Ctrl-C or [`Orchestrator::shutdown`] into a graceful stop
pub struct Orchestrator {
    consumer: ChangeConsumer,
    loader: Arc<IndexLoader>,
    shutdown_tx: broadcast::Sender<()>,
    /// Subscribed at construction so a shutdown sent before `run` is kept.
    shutdown_rx: Mutex<Option<broadcast::Receiver<()>>>,
}

impl Orchestrator {
    pub fn new(source: Arc<dyn EnvelopeSource>, loader: Arc<IndexLoader>) -> Self {
        Self::with_consumer(ChangeConsumer::new(source, loader.clone()), loader)
    }

    pub fn with_consumer(consumer: ChangeConsumer, loader: Arc<IndexLoader>) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        Self {
            consumer,
            loader,
            shutdown_tx,
            shutdown_rx: Mutex::new(Some(shutdown_rx)),
        }
    }

    /// Run until shutdown or until the channel closes.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<ConsumerStats, PipelineError> {
        info!("Starting plan indexer orchestrator");

        self.loader.ensure_index().await?;

        let shutdown_rx = match self.shutdown_rx.lock().await.take() {
            Some(rx) => rx,
            None => self.shutdown_tx.subscribe(),
        };
        let signal_tx = self.shutdown_tx.clone();
        let signal = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
                let _ = signal_tx.send(());
            }
        });

        let result = self.consumer.run(shutdown_rx).await;
        signal.abort();

        info!("Orchestrator shutdown complete");
        result
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannel;
    use crate::publisher::ChangePublisher;
    use crate::test_fixtures::{small_plan, RecordingProvider};
    use plan_indexer_shared::Operation;
    use std::time::Duration;

    #[tokio::test]
    async fn test_runs_until_shutdown() {
        let channel = Arc::new(MemoryChannel::new());
        let provider = RecordingProvider::new();
        let loader = Arc::new(IndexLoader::new(provider.client()));
        let orchestrator = Arc::new(Orchestrator::new(channel.clone(), loader));

        let handle = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.run().await })
        };

        let publisher = ChangePublisher::new(channel.clone());
        publisher.publish(Operation::Create, &small_plan("p1")).await.unwrap();
        publisher.publish(Operation::Delete, &small_plan("p1")).await.unwrap();

        while channel.acked().await < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        orchestrator.shutdown();

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.acked, 2);
        assert_eq!(provider.deleted_ids().len(), 4);
    }

    #[tokio::test]
    async fn test_shutdown_before_run_is_honoured() {
        let channel = Arc::new(MemoryChannel::new());
        let loader = Arc::new(IndexLoader::new(RecordingProvider::new().client()));
        let orchestrator = Orchestrator::new(channel, loader);

        orchestrator.shutdown();
        let stats = tokio::time::timeout(Duration::from_secs(5), orchestrator.run())
            .await
            .expect("run should stop on the earlier shutdown")
            .unwrap();

        assert_eq!(stats, ConsumerStats::default());
    }

    #[tokio::test]
    async fn test_stops_when_channel_closes() {
        let channel = Arc::new(MemoryChannel::new());
        channel.close().await;
        let loader = Arc::new(IndexLoader::new(RecordingProvider::new().client()));
        let orchestrator = Orchestrator::new(channel, loader);

        let stats = orchestrator.run().await.unwrap();

        assert_eq!(stats, ConsumerStats::default());
    }
}
