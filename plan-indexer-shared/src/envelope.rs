//! The change message carried from the write path to the index consumer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::node::Entity;

/// The kind of mutation an envelope describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    #[serde(alias = "POST")]
    Create,
    #[serde(alias = "PATCH")]
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published mutation. Wire format is UTF-8 JSON:
/// `{"operation": "CREATE", "payload": {...}, "timestamp": "2024-01-01T00:00:00.000Z"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEnvelope {
    pub operation: Operation,
    pub payload: Entity,
    pub timestamp: DateTime<Utc>,
}

impl OperationEnvelope {
    /// Wrap a payload, stamping it with the current time.
    pub fn new(operation: Operation, payload: Entity) -> Self {
        Self {
            operation,
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let payload = Entity::from_value(json!({ "objectId": "p1", "objectType": "plan" })).unwrap();
        let envelope = OperationEnvelope::new(Operation::Update, payload);

        let value: serde_json::Value = serde_json::from_slice(&envelope.to_bytes().unwrap()).unwrap();

        assert_eq!(value["operation"], "UPDATE");
        assert_eq!(value["payload"]["objectId"], "p1");
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_decode_legacy_operation_names() {
        let bytes = br#"{"operation":"POST","payload":{"objectId":"p1"},"timestamp":"2024-03-01T10:00:00.000Z"}"#;
        let envelope = OperationEnvelope::from_bytes(bytes).unwrap();
        assert_eq!(envelope.operation, Operation::Create);

        let bytes = br#"{"operation":"PATCH","payload":{"objectId":"p1"},"timestamp":"2024-03-01T10:00:00.000Z"}"#;
        assert_eq!(
            OperationEnvelope::from_bytes(bytes).unwrap().operation,
            Operation::Update
        );
    }

    #[test]
    fn test_reject_unknown_operation() {
        let bytes = br#"{"operation":"PUT","payload":{},"timestamp":"2024-03-01T10:00:00.000Z"}"#;
        assert!(OperationEnvelope::from_bytes(bytes).is_err());
    }
}
