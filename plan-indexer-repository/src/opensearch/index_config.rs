//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and the parent-child mapping for the
//! plan index.

use serde_json::{json, Value};

use crate::config::DEFAULT_JOIN_FIELD;

/// The default name of the plan index.
pub const INDEX_NAME: &str = "planindex";

/// Where plan documents live and how their join field is named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Index name.
    pub name: String,
    /// Name of the `join` field.
    pub join_field: String,
}

impl IndexConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            join_field: DEFAULT_JOIN_FIELD.to_string(),
        }
    }

    pub fn with_join_field(mut self, join_field: impl Into<String>) -> Self {
        self.join_field = join_field.into();
        self
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(INDEX_NAME)
    }
}

fn text_with_keyword() -> Value {
    json!({
        "type": "text",
        "fields": {
            "keyword": { "type": "keyword", "ignore_above": 256 }
        }
    })
}

/// Get the index settings and mappings for the plan index.
///
/// The join field declares the relation hierarchy:
/// - `plan` → `planCostShares`, `linkedPlanServices`
/// - `linkedPlanServices` → `linkedService`, `planserviceCostShares`
///
/// A single primary shard keeps every parent and child together regardless of
/// routing.
pub fn get_index_settings(join_field: &str) -> Value {
    let mut properties = json!({
        "_org": text_with_keyword(),
        "objectId": text_with_keyword(),
        "objectType": text_with_keyword(),
        "name": text_with_keyword(),
        "planType": text_with_keyword(),
        "creationDate": text_with_keyword(),
        "copay": { "type": "integer" },
        "deductible": { "type": "integer" }
    });

    properties[join_field] = json!({
        "type": "join",
        "eager_global_ordinals": true,
        "relations": {
            "plan": ["planCostShares", "linkedPlanServices"],
            "linkedPlanServices": ["linkedService", "planserviceCostShares"]
        }
    });

    json!({
        "settings": {
            "index": {
                "number_of_shards": 1,
                "number_of_replicas": 1
            }
        },
        "mappings": {
            "properties": properties
        }
    })
}
