//! Configuration types for the SearchIndexClient.

/// Name of the join field in the default plan index mapping.
pub const DEFAULT_JOIN_FIELD: &str = "plan_join";

/// Configuration for the SearchIndexClient.
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    /// Field that carries each document's join relation.
    pub join_field: String,
    /// Maximum number of documents a single entity may fan out to in one batch.
    /// `None` disables the limit.
    pub max_batch_size: Option<usize>,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            join_field: DEFAULT_JOIN_FIELD.to_string(),
            max_batch_size: Some(1000),
        }
    }
}

impl SearchIndexConfig {
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = Some(max_batch_size);
        self
    }

    pub fn with_join_field(mut self, join_field: impl Into<String>) -> Self {
        self.join_field = join_field.into();
        self
    }
}
