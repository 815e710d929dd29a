//! Dependency initialization and wiring for the plan indexer.

use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::service::PlanService;
use crate::IndexerError;
use plan_indexer_pipeline::{
    channel::{ChannelConnection, KafkaSinkConnector, KafkaSourceConnector},
    loader::IndexLoader,
    orchestrator::Orchestrator,
    publisher::ChangePublisher,
};
use plan_indexer_repository::{
    opensearch::IndexConfig, KeyValueStore, OpenSearchClient, SearchIndexClient,
};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Connect to OpenSearch and prepare the consumer side of the channel.
    ///
    /// The Kafka consumer connects lazily on its first fetch, retrying per
    /// `settings.reconnect`.
    pub async fn new(settings: &Settings) -> Result<Self, IndexerError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            index_name = %settings.index_name,
            kafka_broker = %settings.kafka.brokers,
            kafka_topic = %settings.kafka.topic,
            kafka_group_id = %settings.kafka.group_id,
            "Initializing dependencies"
        );

        let search_client = Self::search_client(settings).await?;
        let loader = Arc::new(IndexLoader::new(search_client));

        let source = ChannelConnection::new(
            KafkaSourceConnector::new(settings.kafka.clone()),
            settings.reconnect.clone(),
        );
        let orchestrator = Orchestrator::new(Arc::new(source), loader);

        Ok(Self { orchestrator })
    }

    /// The write path over `store`, publishing to the configured Kafka topic.
    ///
    /// The producer connects on the first publish.
    pub fn plan_service(settings: &Settings, store: Arc<dyn KeyValueStore>) -> PlanService {
        PlanService::new(store, ChangePublisher::new(Self::sink_connection(settings)))
    }

    fn sink_connection(settings: &Settings) -> Arc<ChannelConnection<KafkaSinkConnector>> {
        Arc::new(ChannelConnection::new(
            KafkaSinkConnector::new(settings.kafka.clone()),
            settings.reconnect.clone(),
        ))
    }

    /// Create the OpenSearch client and verify the cluster is reachable.
    async fn search_client(settings: &Settings) -> Result<Arc<SearchIndexClient>, IndexerError> {
        let opensearch = OpenSearchClient::new(
            &settings.opensearch_url,
            IndexConfig::new(&settings.index_name),
        )
        .await
        .map_err(|e| IndexerError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        let client = SearchIndexClient::new(Box::new(opensearch));

        let healthy = client
            .health_check()
            .await
            .map_err(|e| IndexerError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(IndexerError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");
        Ok(Arc::new(client))
    }
}
