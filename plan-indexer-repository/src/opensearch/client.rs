//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    DeleteParts, IndexParts, OpenSearch,
};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::types::{DeleteDocumentRequest, IndexDocumentRequest};

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// use plan_indexer_repository::opensearch::IndexConfig;
/// let client = OpenSearchClient::new("http://localhost:9200", IndexConfig::default()).await?;
/// client.ensure_index_exists().await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - The index name and join field
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            index = %index_config.name,
            join_field = %index_config.join_field,
            "Created OpenSearch client"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    pub fn index_config(&self) -> &IndexConfig {
        &self.index_config
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchClient {
    /// Write a document with its routing value.
    ///
    /// An existing document with the same id is replaced.
    async fn index_document(&self, request: &IndexDocumentRequest) -> Result<(), SearchIndexError> {
        let mut call = self
            .client
            .index(IndexParts::IndexId(&self.index_config.name, &request.document_id))
            .body(request.body.clone());

        if let Some(routing) = request.routing.as_deref() {
            call = call.routing(routing);
        }

        let response = call
            .send()
            .await
            .map_err(|e| SearchIndexError::index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Index request failed");
            return Err(SearchIndexError::index(format!(
                "Index failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(
            doc_id = %request.document_id,
            routing = ?request.routing,
            "Document indexed"
        );
        Ok(())
    }

    /// Delete a document by id. A missing document is not an error.
    async fn delete_document(&self, request: &DeleteDocumentRequest) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(&self.index_config.name, &request.document_id))
            .send()
            .await
            .map_err(|e| SearchIndexError::delete(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - document may not exist
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Delete request failed");
            return Err(SearchIndexError::delete(format!(
                "Delete failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(doc_id = %request.document_id, "Document deleted");
        Ok(())
    }

    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        let index = self.index_config.name.as_str();

        let exists = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        if exists.status_code().is_success() {
            debug!(index = %index, "Index already exists");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(get_index_settings(&self.index_config.join_field))
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            // Another instance may have created it between the two calls.
            if error_body.contains("resource_already_exists_exception") {
                return Ok(());
            }
            error!(status = %status, body = %error_body, "Index creation failed");
            return Err(SearchIndexError::index_creation(format!(
                "Index creation failed with status {}: {}",
                status, error_body
            )));
        }

        info!(index = %index, "Created plan index");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        Ok(response.status_code().is_success())
    }
}
