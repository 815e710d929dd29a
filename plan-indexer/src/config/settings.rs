//! Runtime settings read from the environment.

use std::env;
use std::time::Duration;

use crate::observability::LogFormat;
use crate::IndexerError;
use plan_indexer_pipeline::channel::{KafkaConfig, ReconnectPolicy};
use plan_indexer_repository::opensearch::INDEX_NAME;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default Kafka broker address.
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default topic carrying operation envelopes.
const DEFAULT_KAFKA_TOPIC: &str = "json-operations";

/// Default Kafka consumer group ID.
const DEFAULT_KAFKA_GROUP_ID: &str = "plan-indexer";

const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;
const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Everything the indexer needs to start.
#[derive(Debug, Clone)]
pub struct Settings {
    pub opensearch_url: String,
    pub index_name: String,
    pub kafka: KafkaConfig,
    pub reconnect: ReconnectPolicy,
    pub log_format: LogFormat,
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `INDEX_NAME`: search index name (default: planindex)
    /// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
    /// - `KAFKA_TOPIC`: envelope topic (default: json-operations)
    /// - `KAFKA_GROUP_ID`: Consumer group ID (default: plan-indexer)
    /// - `CHANNEL_CONNECT_ATTEMPTS`: connect attempts before giving up (default: 5)
    /// - `CHANNEL_RETRY_DELAY_MS`: first reconnect delay (default: 500)
    /// - `LOG_FORMAT`: `json` or `pretty` (default: pretty)
    pub fn from_env() -> Result<Self, IndexerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IndexerError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let connect_attempts =
            parse_number(&lookup, "CHANNEL_CONNECT_ATTEMPTS", DEFAULT_CONNECT_ATTEMPTS)?;
        let retry_delay_ms =
            parse_number(&lookup, "CHANNEL_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS)?;
        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>().map_err(IndexerError::config)?,
            None => LogFormat::default(),
        };

        Ok(Self {
            opensearch_url: var("OPENSEARCH_URL", DEFAULT_OPENSEARCH_URL),
            index_name: var("INDEX_NAME", INDEX_NAME),
            kafka: KafkaConfig::new(
                var("KAFKA_BROKER", DEFAULT_KAFKA_BROKER),
                var("KAFKA_TOPIC", DEFAULT_KAFKA_TOPIC),
                var("KAFKA_GROUP_ID", DEFAULT_KAFKA_GROUP_ID),
            ),
            reconnect: ReconnectPolicy::new(
                connect_attempts,
                Duration::from_millis(retry_delay_ms),
            ),
            log_format,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, IndexerError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| IndexerError::config(format!("{} must be a number, got '{}'", key, raw))),
        None => Ok(default),
    }
}
