//! Request and response types for search index operations.

use serde_json::Value;

use crate::errors::SearchIndexError;
use plan_indexer_shared::SubDocument;

/// Request to write one document into the search index.
///
/// The document id is the node's `objectId`. Child documents carry the
/// routing value of their parent so that parent and child share a shard.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocumentRequest {
    /// The index document id (`objectId`).
    pub document_id: String,
    /// Shard routing; `None` for root documents.
    pub routing: Option<String>,
    /// Attributes plus the join relation.
    pub body: Value,
}

impl IndexDocumentRequest {
    /// Build the index write for a decomposed sub-document.
    pub fn from_sub_document(document: &SubDocument, join_field: &str) -> Self {
        let routing = document.routing();
        Self {
            document_id: document.object_id.clone(),
            routing: (!routing.is_empty()).then(|| routing.to_string()),
            body: document.body(join_field),
        }
    }
}

/// Request to delete a document from the search index by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteDocumentRequest {
    /// The index document id (`objectId`).
    pub document_id: String,
}

impl DeleteDocumentRequest {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
        }
    }
}

/// Result of a batch operation for a single item.
///
/// This struct represents the outcome of a single operation within a batch (e.g.,
/// indexing or deleting one document). It indicates whether the operation
/// succeeded and includes error details if it failed.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The index document id.
    pub document_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchIndexError>,
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// Every item of the batch is attempted; callers decide what a partial failure
/// means for them.
#[derive(Debug, Clone, Default)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item, in request order.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// An empty summary for an empty batch.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Record the outcome of one item.
    pub fn record(&mut self, document_id: &str, outcome: Result<(), SearchIndexError>) {
        self.total += 1;
        match outcome {
            Ok(()) => {
                self.succeeded += 1;
                self.results.push(BatchOperationResult {
                    document_id: document_id.to_string(),
                    success: true,
                    error: None,
                });
            }
            Err(e) => {
                self.failed += 1;
                self.results.push(BatchOperationResult {
                    document_id: document_id.to_string(),
                    success: false,
                    error: Some(e),
                });
            }
        }
    }

    /// Fold the results of another batch into this one.
    pub fn extend(&mut self, other: BatchOperationSummary) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.results.extend(other.results);
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Ids of the items that failed.
    pub fn failed_ids(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.document_id.clone())
            .collect()
    }

    /// The first recorded error, if any.
    pub fn first_error(&self) -> Option<&SearchIndexError> {
        self.results.iter().find_map(|r| r.error.as_ref())
    }
}
