//! Publishes mutations to the durable channel.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::channel::EnvelopeSink;
use crate::errors::PipelineError;
use plan_indexer_shared::{Entity, Operation, OperationEnvelope};

/// Wraps mutations into envelopes and writes them to the channel.
///
/// A successful publish only means the envelope is durably stored, not that
/// the search index has caught up.
#[derive(Clone)]
pub struct ChangePublisher {
    sink: Arc<dyn EnvelopeSink>,
}

impl ChangePublisher {
    pub fn new(sink: Arc<dyn EnvelopeSink>) -> Self {
        Self { sink }
    }

    /// Publish one mutation, stamped with the current time.
    #[instrument(skip(self, payload), fields(object_id = ?payload.object_id()))]
    pub async fn publish(
        &self,
        operation: Operation,
        payload: &Entity,
    ) -> Result<bool, PipelineError> {
        let envelope = OperationEnvelope::new(operation, payload.clone());
        let bytes = envelope
            .to_bytes()
            .map_err(|e| PipelineError::serialization(e.to_string()))?;
        // Ordering comes from the single-partition topic, not from the key.
        let key = payload.object_id();

        let sent = self
            .sink
            .send(key.as_deref(), &bytes, operation)
            .await
            .map_err(|e| {
                error!(operation = %operation, error = %e, "Failed to publish envelope");
                PipelineError::channel_unavailable(e.to_string())
            })?;

        info!(operation = %operation, timestamp = %envelope.timestamp, "Published envelope");
        Ok(sent)
    }
}
