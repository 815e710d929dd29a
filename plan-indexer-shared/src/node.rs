//! The nested entity model.
//!
//! A plan is a rooted tree of [`Node`]s. Object nodes that carry an `objectId`
//! are first-class sub-entities and each becomes its own document in the
//! search index.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field holding the identifier of a sub-entity.
pub const OBJECT_ID: &str = "objectId";

/// Field holding the type name of a sub-entity.
pub const OBJECT_TYPE: &str = "objectType";

/// Named fields of an object node.
///
/// Ordered so that serializing the same entity always yields the same bytes,
/// which the concurrency fingerprint depends on.
pub type Fields = BTreeMap<String, Node>;

/// A leaf value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl Scalar {
    /// Render the scalar as an identifier.
    ///
    /// Only non-empty strings and numbers can identify a sub-entity.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Scalar::String(s) if !s.is_empty() => Some(s.clone()),
            Scalar::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value.into())
    }
}

/// A node of the entity tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Object(Fields),
    Array(Vec<Node>),
    Scalar(Scalar),
}

impl Node {
    pub fn as_object(&self) -> Option<&Fields> {
        match self {
            Node::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Node>> {
        match self {
            Node::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The `objectId` of an object node, if it has a usable one.
    pub fn object_id(&self) -> Option<String> {
        self.as_object().and_then(object_id_of)
    }
}

/// Read the `objectId` out of a set of object fields.
pub fn object_id_of(fields: &Fields) -> Option<String> {
    match fields.get(OBJECT_ID) {
        Some(Node::Scalar(scalar)) => scalar.as_key(),
        _ => None,
    }
}

/// Errors raised while reading or validating an entity.
#[derive(Error, Debug)]
pub enum EntityError {
    /// The input is not a JSON object or is not valid JSON.
    #[error("Malformed entity: {0}")]
    Malformed(String),

    /// The root object has no usable `objectId`.
    #[error("Entity is missing a non-empty objectId")]
    MissingObjectId,

    /// The root object has no `objectType` string.
    #[error("Entity is missing objectType")]
    MissingObjectType,
}

/// A plan entity: the root object of a node tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity {
    fields: Fields,
}

impl Entity {
    pub fn new(fields: Fields) -> Self {
        Self { fields }
    }

    /// Parse an entity from its JSON text.
    pub fn from_json(text: &str) -> Result<Self, EntityError> {
        serde_json::from_str(text).map_err(|e| EntityError::Malformed(e.to_string()))
    }

    /// Build an entity from an already parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, EntityError> {
        serde_json::from_value(value).map_err(|e| EntityError::Malformed(e.to_string()))
    }

    /// Serialize the entity. Field order is canonical.
    pub fn to_json(&self) -> Result<String, EntityError> {
        serde_json::to_string(self).map_err(|e| EntityError::Malformed(e.to_string()))
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Node> {
        self.fields.get(field)
    }

    pub fn object_id(&self) -> Option<String> {
        object_id_of(&self.fields)
    }

    pub fn object_type(&self) -> Option<&str> {
        match self.fields.get(OBJECT_TYPE) {
            Some(Node::Scalar(Scalar::String(s))) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Check the minimum shape every stored plan must have.
    pub fn validate(&self) -> Result<(), EntityError> {
        if self.object_id().is_none() {
            return Err(EntityError::MissingObjectId);
        }
        if self.object_type().is_none() {
            return Err(EntityError::MissingObjectType);
        }
        Ok(())
    }
}

impl From<Entity> for Node {
    fn from(entity: Entity) -> Self {
        Node::Object(entity.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_nested_entity() {
        let entity = Entity::from_value(json!({
            "objectId": "plan-1",
            "objectType": "plan",
            "active": true,
            "note": null,
            "planCostShares": { "objectId": "cs-1", "copay": 23 },
            "tags": ["a", "b"]
        }))
        .unwrap();

        assert_eq!(entity.object_id(), Some("plan-1".to_string()));
        assert_eq!(entity.object_type(), Some("plan"));
        assert_eq!(entity.get("note"), Some(&Node::Scalar(Scalar::Null)));
        assert_eq!(entity.get("active"), Some(&Node::Scalar(Scalar::Bool(true))));
        assert_eq!(
            entity.get("planCostShares").and_then(Node::object_id),
            Some("cs-1".to_string())
        );
        assert_eq!(entity.get("tags").and_then(Node::as_array).map(Vec::len), Some(2));
    }

    #[test]
    fn test_serialization_is_canonical() {
        let a = Entity::from_json(r#"{"b":1,"a":{"y":2,"x":1},"objectId":"p"}"#).unwrap();
        let b = Entity::from_json(r#"{"objectId":"p","a":{"x":1,"y":2},"b":1}"#).unwrap();

        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
        assert_eq!(
            a.to_json().unwrap(),
            r#"{"a":{"x":1,"y":2},"b":1,"objectId":"p"}"#
        );
    }

    #[test]
    fn test_decimals_survive_reserialization() {
        let first = Entity::from_json(r#"{"deductible":7938.6843516156105,"objectId":"p"}"#)
            .unwrap()
            .to_json()
            .unwrap();
        let second = Entity::from_json(&first).unwrap().to_json().unwrap();

        assert_eq!(first, second);
        assert_eq!(
            Entity::from_json(&first).unwrap().get("deductible"),
            Some(&Node::Scalar(Scalar::Number(
                serde_json::Number::from_f64(7938.6843516156105).unwrap()
            )))
        );
    }

    #[test]
    fn test_non_object_root_is_malformed() {
        assert!(matches!(
            Entity::from_json("[1, 2]"),
            Err(EntityError::Malformed(_))
        ));
        assert!(matches!(
            Entity::from_json("{not json"),
            Err(EntityError::Malformed(_))
        ));
    }

    #[test]
    fn test_validate() {
        let missing_id = Entity::from_value(json!({ "objectType": "plan" })).unwrap();
        assert!(matches!(missing_id.validate(), Err(EntityError::MissingObjectId)));

        let empty_id = Entity::from_value(json!({ "objectId": "", "objectType": "plan" })).unwrap();
        assert!(matches!(empty_id.validate(), Err(EntityError::MissingObjectId)));

        let missing_type = Entity::from_value(json!({ "objectId": "p" })).unwrap();
        assert!(matches!(missing_type.validate(), Err(EntityError::MissingObjectType)));

        let ok = Entity::from_value(json!({ "objectId": "p", "objectType": "plan" })).unwrap();
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_numeric_object_id_is_a_key() {
        let node: Node = serde_json::from_value(json!({ "objectId": 42 })).unwrap();
        assert_eq!(node.object_id(), Some("42".to_string()));
    }
}
