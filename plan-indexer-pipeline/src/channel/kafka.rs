//! Kafka channel backend.
//!
//! The producer waits for acknowledgement from all in-sync replicas, so a
//! successful send means the envelope is on stable storage. The consumer
//! commits offsets by hand: a settled delivery is committed past, anything
//! uncommitted is delivered again after a restart.
//!
//! Envelopes are applied in publish order across all entities, which Kafka
//! only guarantees within one partition. The topic must therefore have a
//! single partition; connectors refuse a topic with more. The message key
//! (the root `objectId`) is informational.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    message::{Header, Message, OwnedHeaders},
    producer::{FutureProducer, FutureRecord, Producer},
    metadata::Metadata,
    Offset, TopicPartitionList,
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::channel::{Connector, Delivery, DeliveryTag, EnvelopeSink, EnvelopeSource};
use crate::errors::ChannelError;
use plan_indexer_shared::Operation;

/// Connection settings shared by both sides of the Kafka channel.
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub topic: String,
    pub group_id: String,
    /// How long a send may wait in the producer queue.
    pub send_timeout: Duration,
    /// Timeout of the metadata probe made while connecting.
    pub probe_timeout: Duration,
}

impl KafkaConfig {
    pub fn new(
        brokers: impl Into<String>,
        topic: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            brokers: brokers.into(),
            topic: topic.into(),
            group_id: group_id.into(),
            send_timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Publishing side backed by a Kafka producer.
pub struct KafkaSink {
    producer: FutureProducer,
    topic: String,
    send_timeout: Duration,
}

impl KafkaSink {
    pub fn new(config: &KafkaConfig) -> Result<Self, ChannelError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", "plan-indexer")
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("compression.type", "zstd")
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| ChannelError::connection(e.to_string()))?;

        info!(brokers = %config.brokers, topic = %config.topic, "Created Kafka producer");

        Ok(Self {
            producer,
            topic: config.topic.clone(),
            send_timeout: config.send_timeout,
        })
    }
}

#[async_trait]
impl EnvelopeSink for KafkaSink {
    #[instrument(skip(self, payload), fields(topic = %self.topic, bytes = payload.len()))]
    async fn send(
        &self,
        key: Option<&str>,
        payload: &[u8],
        operation: Operation,
    ) -> Result<bool, ChannelError> {
        let message_id = Uuid::new_v4().to_string();
        let headers = OwnedHeaders::new()
            .insert(Header {
                key: "operation",
                value: Some(operation.as_str()),
            })
            .insert(Header {
                key: "message-id",
                value: Some(message_id.as_str()),
            });

        let mut record = FutureRecord::<str, [u8]>::to(&self.topic)
            .payload(payload)
            .headers(headers);
        if let Some(key) = key {
            record = record.key(key);
        }

        match self.producer.send(record, self.send_timeout).await {
            Ok((partition, offset)) => {
                debug!(
                    message_id = %message_id,
                    partition = partition,
                    offset = offset,
                    "Envelope persisted"
                );
                Ok(true)
            }
            Err((e, _)) => Err(ChannelError::publish(e.to_string())),
        }
    }
}

/// Consuming side backed by a Kafka consumer group member.
pub struct KafkaSource {
    consumer: StreamConsumer,
    topic: String,
    in_flight: Mutex<Option<DeliveryTag>>,
}

impl KafkaSource {
    pub fn new(config: &KafkaConfig) -> Result<Self, ChannelError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| ChannelError::connection(e.to_string()))?;

        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|e| ChannelError::connection(e.to_string()))?;

        info!(
            brokers = %config.brokers,
            topic = %config.topic,
            group_id = %config.group_id,
            "Created Kafka consumer"
        );

        Ok(Self {
            consumer,
            topic: config.topic.clone(),
            in_flight: Mutex::new(None),
        })
    }

    /// Commit past a delivery so it is not seen again.
    async fn settle(&self, tag: DeliveryTag) -> Result<(), ChannelError> {
        let mut in_flight = self.in_flight.lock().await;
        if *in_flight != Some(tag) {
            return Err(ChannelError::UnknownDelivery(tag.offset));
        }

        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(&self.topic, tag.partition, Offset::Offset(tag.offset + 1))
            .map_err(|e| ChannelError::acknowledge(e.to_string()))?;

        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| ChannelError::acknowledge(e.to_string()))?;

        *in_flight = None;
        Ok(())
    }
}

#[async_trait]
impl EnvelopeSource for KafkaSource {
    async fn fetch(&self) -> Result<Option<Delivery>, ChannelError> {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(tag) = *in_flight {
            return Err(ChannelError::PrefetchExceeded(tag.offset));
        }

        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| ChannelError::fetch(e.to_string()))?;

        let tag = DeliveryTag {
            partition: message.partition(),
            offset: message.offset(),
        };
        let payload = match message.payload() {
            Some(p) => p.to_vec(),
            None => {
                debug!(offset = tag.offset, "Received message with empty payload");
                Vec::new()
            }
        };

        *in_flight = Some(tag);
        Ok(Some(Delivery { tag, payload }))
    }

    async fn ack(&self, tag: DeliveryTag) -> Result<(), ChannelError> {
        self.settle(tag).await
    }

    async fn nack(&self, tag: DeliveryTag) -> Result<(), ChannelError> {
        warn!(
            partition = tag.partition,
            offset = tag.offset,
            "Discarding delivery without requeue"
        );
        self.settle(tag).await
    }
}

/// Connects a [`KafkaSink`], probing the broker before reporting ready.
pub struct KafkaSinkConnector {
    config: KafkaConfig,
}

impl KafkaSinkConnector {
    pub fn new(config: KafkaConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for KafkaSinkConnector {
    type Channel = KafkaSink;

    async fn connect(&self) -> Result<Arc<KafkaSink>, ChannelError> {
        let sink = KafkaSink::new(&self.config)?;
        let topic = self.config.topic.clone();
        let timeout = self.config.probe_timeout;

        // Metadata requests block; keep them off the runtime threads.
        let sink = tokio::task::spawn_blocking(move || -> Result<KafkaSink, ChannelError> {
            let metadata = sink.producer.client().fetch_metadata(Some(&topic), timeout)?;
            ensure_single_partition(&topic, partition_count(&metadata, &topic))?;
            Ok(sink)
        })
        .await
        .map_err(|e| ChannelError::connection(e.to_string()))??;

        Ok(Arc::new(sink))
    }
}

/// Connects a [`KafkaSource`], probing the broker before reporting ready.
pub struct KafkaSourceConnector {
    config: KafkaConfig,
}

impl KafkaSourceConnector {
    pub fn new(config: KafkaConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for KafkaSourceConnector {
    type Channel = KafkaSource;

    async fn connect(&self) -> Result<Arc<KafkaSource>, ChannelError> {
        let source = KafkaSource::new(&self.config)?;
        let topic = self.config.topic.clone();
        let timeout = self.config.probe_timeout;

        let source = tokio::task::spawn_blocking(move || -> Result<KafkaSource, ChannelError> {
            let metadata = source.consumer.fetch_metadata(Some(&topic), timeout)?;
            ensure_single_partition(&topic, partition_count(&metadata, &topic))?;
            Ok(source)
        })
        .await
        .map_err(|e| ChannelError::connection(e.to_string()))??;

        Ok(Arc::new(source))
    }
}

fn partition_count(metadata: &Metadata, topic: &str) -> usize {
    metadata
        .topics()
        .iter()
        .find(|t| t.name() == topic)
        .map_or(0, |t| t.partitions().len())
}

/// Reject topics whose partitions would reorder envelopes.
///
/// Zero partitions means the topic does not exist yet and will be
/// auto-created with the broker default.
fn ensure_single_partition(topic: &str, partitions: usize) -> Result<(), ChannelError> {
    if partitions > 1 {
        return Err(ChannelError::connection(format!(
            "topic {} has {} partitions; envelopes are only ordered on a single-partition topic",
            topic, partitions
        )));
    }
    Ok(())
}
