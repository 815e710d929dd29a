//! Loader module for the plan indexer pipeline.
//!
//! Applies envelopes to the search index: decomposed documents are written,
//! enumerated ids are purged.

use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::errors::PipelineError;
use crate::processor::{Decomposer, KeyEnumerator};
use plan_indexer_repository::{
    BatchOperationSummary, DeleteDocumentRequest, IndexDocumentRequest, SearchIndexClient,
};
use plan_indexer_shared::{Entity, Operation, OperationEnvelope};

/// Writes and purges the documents of whole entities.
///
/// Every document of an entity is attempted; the outcome is returned as one
/// summary and any failed document turns the call into an
/// `IndexDispatchFailure`.
pub struct IndexLoader {
    client: Arc<SearchIndexClient>,
    decomposer: Decomposer,
    enumerator: KeyEnumerator,
}

impl IndexLoader {
    pub fn new(client: Arc<SearchIndexClient>) -> Self {
        Self::with_decomposer(client, Decomposer::new())
    }

    pub fn with_decomposer(client: Arc<SearchIndexClient>, decomposer: Decomposer) -> Self {
        Self {
            client,
            decomposer,
            enumerator: KeyEnumerator::new(),
        }
    }

    /// Apply one envelope.
    ///
    /// `CREATE` indexes, `UPDATE` purges then reindexes, `DELETE` purges.
    #[instrument(skip(self, envelope), fields(operation = %envelope.operation, object_id = ?envelope.payload.object_id()))]
    pub async fn apply(
        &self,
        envelope: &OperationEnvelope,
    ) -> Result<BatchOperationSummary, PipelineError> {
        match envelope.operation {
            Operation::Create => self.index_entity(&envelope.payload).await,
            Operation::Update => self.reindex_entity(&envelope.payload).await,
            Operation::Delete => self.delete_entity(&envelope.payload).await,
        }
    }

    /// Write every sub-document of the entity.
    pub async fn index_entity(&self, entity: &Entity) -> Result<BatchOperationSummary, PipelineError> {
        let join_field = self.client.join_field();
        let requests: Vec<IndexDocumentRequest> = self
            .decomposer
            .decompose(entity)
            .values()
            .map(|document| IndexDocumentRequest::from_sub_document(document, join_field))
            .collect();

        let mut summary = BatchOperationSummary::empty();
        for chunk in requests.chunks(self.chunk_size(requests.len())) {
            summary.extend(self.client.batch_index(chunk).await?);
        }

        debug!(documents = summary.total, "Indexed entity");
        require_success(summary, "index")
    }

    /// Delete every document carrying one of the entity's ids.
    pub async fn delete_entity(&self, entity: &Entity) -> Result<BatchOperationSummary, PipelineError> {
        let requests: Vec<DeleteDocumentRequest> = self
            .enumerator
            .enumerate_ids(entity)
            .into_iter()
            .map(DeleteDocumentRequest::new)
            .collect();

        let mut summary = BatchOperationSummary::empty();
        for chunk in requests.chunks(self.chunk_size(requests.len())) {
            summary.extend(self.client.batch_delete(chunk).await?);
        }

        debug!(documents = summary.total, "Purged entity");
        require_success(summary, "delete")
    }

    /// Purge the entity's documents, then write them again.
    ///
    /// A failed purge stops before anything is reindexed.
    pub async fn reindex_entity(&self, entity: &Entity) -> Result<BatchOperationSummary, PipelineError> {
        let mut summary = self.delete_entity(entity).await?;
        summary.extend(self.index_entity(entity).await?);
        Ok(summary)
    }

    /// Ensure the search index exists.
    pub async fn ensure_index(&self) -> Result<(), PipelineError> {
        self.client.ensure_index().await?;
        info!("Search index is ready");
        Ok(())
    }

    /// Check if the search engine is healthy.
    pub async fn health_check(&self) -> Result<bool, PipelineError> {
        Ok(self.client.health_check().await?)
    }

    fn chunk_size(&self, total: usize) -> usize {
        self.client.max_batch_size().unwrap_or(total).max(1)
    }
}

fn require_success(
    summary: BatchOperationSummary,
    action: &str,
) -> Result<BatchOperationSummary, PipelineError> {
    if summary.is_success() {
        return Ok(summary);
    }

    let failed_ids = summary.failed_ids();
    let cause = summary
        .first_error()
        .map(|e| e.to_string())
        .unwrap_or_default();
    error!(
        action = action,
        failed = summary.failed,
        total = summary.total,
        failed_ids = ?failed_ids,
        "Search index writes failed"
    );

    Err(PipelineError::index_dispatch(format!(
        "{} failed for {} of {} documents: {}",
        action, summary.failed, summary.total, cause
    )))
}
