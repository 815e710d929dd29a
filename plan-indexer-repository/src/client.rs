//! Search index client implementation.
//!
//! This module provides the main client for interacting with the search index.
//! The replication pipeline uses it to write and purge plan sub-documents.

use tracing::debug;

use crate::config::SearchIndexConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::{BatchOperationSummary, DeleteDocumentRequest, IndexDocumentRequest};

/// The main client for interacting with the search index.
pub struct SearchIndexClient {
    provider: Box<dyn SearchIndexProvider>,
    config: SearchIndexConfig,
}

impl SearchIndexClient {
    /// Create a new SearchIndexClient with default configuration.
    pub fn new(provider: Box<dyn SearchIndexProvider>) -> Self {
        Self {
            provider,
            config: SearchIndexConfig::default(),
        }
    }

    /// Create a new SearchIndexClient with custom configuration.
    pub fn with_config(provider: Box<dyn SearchIndexProvider>, config: SearchIndexConfig) -> Self {
        Self { provider, config }
    }

    /// Field the join relation is written under.
    pub fn join_field(&self) -> &str {
        &self.config.join_field
    }

    pub fn max_batch_size(&self) -> Option<usize> {
        self.config.max_batch_size
    }

    /// Check if batch size exceeds the configured limit.
    fn validate_batch_size(&self, size: usize) -> Result<(), SearchIndexError> {
        if let Some(max) = self.config.max_batch_size {
            if size > max {
                return Err(SearchIndexError::batch_size_exceeded(size, max));
            }
        }
        Ok(())
    }

    fn validate_document_id(document_id: &str) -> Result<(), SearchIndexError> {
        if document_id.is_empty() {
            return Err(SearchIndexError::validation("document_id is required"));
        }
        Ok(())
    }

    /// Delete one document by id.
    pub async fn delete(&self, request: &DeleteDocumentRequest) -> Result<(), SearchIndexError> {
        Self::validate_document_id(&request.document_id)?;
        self.provider.delete_document(request).await
    }

    /// Write all sub-documents of one entity.
    /// Input: the index writes produced by decomposing an entity
    /// Output: Result<BatchOperationSummary, SearchIndexError>
    ///
    /// Individual failures are reported in the summary. The whole batch is
    /// rejected up front when it exceeds `max_batch_size` or holds an empty id.
    pub async fn batch_index(
        &self,
        requests: &[IndexDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if requests.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }

        self.validate_batch_size(requests.len())?;
        for request in requests {
            Self::validate_document_id(&request.document_id)?;
        }

        let summary = self.provider.bulk_index_documents(requests).await?;
        debug!(
            total = summary.total,
            failed = summary.failed,
            "Batch index completed"
        );
        Ok(summary)
    }

    /// Delete all documents of one entity.
    ///
    /// Documents that don't exist are considered successful deletes.
    pub async fn batch_delete(
        &self,
        requests: &[DeleteDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if requests.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }

        self.validate_batch_size(requests.len())?;
        for request in requests {
            Self::validate_document_id(&request.document_id)?;
        }

        let summary = self.provider.bulk_delete_documents(requests).await?;
        debug!(
            total = summary.total,
            failed = summary.failed,
            "Batch delete completed"
        );
        Ok(summary)
    }

    /// Create the index with its join mapping when it is missing.
    pub async fn ensure_index(&self) -> Result<(), SearchIndexError> {
        self.provider.ensure_index_exists().await
    }

    /// Check that the search engine is reachable.
    pub async fn health_check(&self) -> Result<bool, SearchIndexError> {
        self.provider.health_check().await
    }
}
