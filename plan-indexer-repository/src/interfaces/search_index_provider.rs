//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;

use crate::errors::SearchIndexError;
use crate::types::{BatchOperationSummary, DeleteDocumentRequest, IndexDocumentRequest};

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// Implementations are injected into `SearchIndexClient` so the pipeline can be
/// exercised against mock implementations in tests.
///
/// All methods return `Result<T, SearchIndexError>` for consistent error handling across
/// different backend implementations.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Index a single document in the search index.
    ///
    /// If a document with the same id already exists, it is replaced.
    ///
    /// # Arguments
    ///
    /// * `request` - The document id, its routing value and its body
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the document was indexed successfully
    /// * `Err(SearchIndexError)` - If indexing fails
    async fn index_document(&self, request: &IndexDocumentRequest) -> Result<(), SearchIndexError>;

    /// Delete a document from the search index.
    ///
    /// If the document doesn't exist, the operation is considered successful.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the document was deleted (or didn't exist)
    /// * `Err(SearchIndexError)` - If the deletion fails
    async fn delete_document(&self, request: &DeleteDocumentRequest) -> Result<(), SearchIndexError>;

    /// Index several documents, one after the other, and summarize the outcome.
    ///
    /// Every request is attempted even when an earlier one fails; the writes are
    /// issued sequentially and in slice order.
    async fn bulk_index_documents(
        &self,
        requests: &[IndexDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut summary = BatchOperationSummary::empty();
        for request in requests {
            let outcome = self.index_document(request).await;
            summary.record(&request.document_id, outcome);
        }
        Ok(summary)
    }

    /// Delete several documents, one after the other, and summarize the outcome.
    ///
    /// Documents that don't exist count as successful deletions.
    async fn bulk_delete_documents(
        &self,
        requests: &[DeleteDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut summary = BatchOperationSummary::empty();
        for request in requests {
            let outcome = self.delete_document(request).await;
            summary.record(&request.document_id, outcome);
        }
        Ok(summary)
    }

    /// Ensure the search index exists with its join mapping.
    ///
    /// This should be called during application startup.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError>;

    /// Check if the search engine is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the search engine is healthy
    /// * `Ok(false)` - If the search engine is unhealthy
    /// * `Err(SearchIndexError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchIndexError>;
}
