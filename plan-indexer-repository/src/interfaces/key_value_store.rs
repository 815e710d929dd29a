//! Primary store trait definition.
//!
//! Plans are stored as serialized JSON strings under their root `objectId`.
//! The store is a plain keyed store; it knows nothing about plan structure.

use async_trait::async_trait;

use crate::errors::StoreError;

/// A string-keyed, string-valued store with Redis-like semantics.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, or `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`; returns the number of keys removed (0 or 1).
    async fn del(&self, key: &str) -> Result<u64, StoreError>;

    /// List the keys matching a glob `pattern` (`*`, `?` and `[...]` classes).
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;
}
