//! Optimistic-concurrency merge of partial updates.

use tracing::{debug, warn};

use crate::errors::PipelineError;
use plan_indexer_shared::{Entity, Node, OBJECT_ID};

/// Array field whose elements are upserted by `objectId` instead of replaced.
pub const KEYED_ARRAY_FIELD: &str = "linkedPlanServices";

/// Applies a patch to a stored entity after checking its concurrency token.
///
/// There is no locking: two patches computed against the same base state can
/// both pass the token check.
#[derive(Debug, Clone)]
pub struct ConcurrencyMerger {
    keyed_array_field: String,
}

impl ConcurrencyMerger {
    pub fn new() -> Self {
        Self::with_keyed_array_field(KEYED_ARRAY_FIELD)
    }

    pub fn with_keyed_array_field(field: impl Into<String>) -> Self {
        Self {
            keyed_array_field: field.into(),
        }
    }

    /// Merge `patch` into `existing`.
    ///
    /// `current_token` is the fingerprint of the stored serialization of
    /// `existing`, taken from the stored text rather than a re-serialization.
    /// Fails with `PreconditionFailed` when `if_match` is given and differs
    /// from it. `existing` itself is never modified.
    pub fn merge(
        &self,
        existing: &Entity,
        current_token: &str,
        patch: &Entity,
        if_match: Option<&str>,
    ) -> Result<Entity, PipelineError> {
        if let Some(expected) = if_match {
            if expected != current_token {
                warn!(
                    object_id = ?existing.object_id(),
                    expected = %expected,
                    current = %current_token,
                    "Stale concurrency token"
                );
                return Err(PipelineError::precondition_failed(expected, current_token));
            }
        }

        let mut merged = existing.clone();
        for (key, value) in patch.fields() {
            if key == OBJECT_ID {
                if existing.get(OBJECT_ID) != Some(value) {
                    debug!(object_id = ?existing.object_id(), "Ignoring objectId in patch");
                }
                continue;
            }

            let next = if *key == self.keyed_array_field {
                upsert_by_object_id(existing.get(key), value)
            } else {
                value.clone()
            };
            merged.fields_mut().insert(key.clone(), next);
        }

        Ok(merged)
    }
}

impl Default for ConcurrencyMerger {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace elements sharing an `objectId` in place and append the rest.
///
/// Falls back to a plain replacement when either side is not an array.
fn upsert_by_object_id(existing: Option<&Node>, patch: &Node) -> Node {
    let (Some(current), Some(updates)) = (existing.and_then(Node::as_array), patch.as_array())
    else {
        return patch.clone();
    };

    let mut items = current.clone();
    for update in updates {
        let position = update
            .object_id()
            .and_then(|id| items.iter().position(|item| item.object_id().as_deref() == Some(id.as_str())));

        match position {
            Some(index) => items[index] = update.clone(),
            None => items.push(update.clone()),
        }
    }
    Node::Array(items)
}
