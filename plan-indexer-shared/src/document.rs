//! Flat documents stored in the parent-child search index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::node::Scalar;

/// Role of a document inside the index's join hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRelation {
    /// Relation name, e.g. `plan`, `planCostShares`, `linkedPlanServices`.
    pub name: String,
    /// `objectId` of the parent document; empty for the root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent: String,
}

impl JoinRelation {
    pub fn new(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: parent.into(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_empty()
    }
}

/// One identifiable object node of an entity, flattened for indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct SubDocument {
    /// Composite key `{parent_id}:{object_id}`.
    pub id: String,
    /// The node's own `objectId`; used as the index document id.
    pub object_id: String,
    /// Parent id the document is keyed and routed under.
    pub parent_id: String,
    /// Scalar fields of the node. Nested objects and arrays are separate documents.
    pub attributes: BTreeMap<String, Scalar>,
    pub join: JoinRelation,
}

impl SubDocument {
    pub fn new(
        parent_id: impl Into<String>,
        object_id: impl Into<String>,
        attributes: BTreeMap<String, Scalar>,
        join: JoinRelation,
    ) -> Self {
        let parent_id = parent_id.into();
        let object_id = object_id.into();
        Self {
            id: Self::composite_id(&parent_id, &object_id),
            object_id,
            parent_id,
            attributes,
            join,
        }
    }

    pub fn composite_id(parent_id: &str, object_id: &str) -> String {
        format!("{}:{}", parent_id, object_id)
    }

    /// Shard routing value: join indexes need children on their parent's shard.
    pub fn routing(&self) -> &str {
        &self.parent_id
    }

    /// The index body: the scalar attributes plus the join relation under `join_field`.
    pub fn body(&self, join_field: &str) -> Value {
        let mut body = Map::new();
        for (key, value) in &self.attributes {
            body.insert(key.clone(), serde_json::to_value(value).unwrap_or(Value::Null));
        }
        body.insert(
            join_field.to_string(),
            serde_json::to_value(&self.join).unwrap_or(Value::Null),
        );
        Value::Object(body)
    }
}
