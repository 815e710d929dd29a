//! In-process primary store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use glob::Pattern;
use tokio::sync::RwLock;

use crate::errors::StoreError;
use crate::interfaces::KeyValueStore;

/// A [`KeyValueStore`] held in memory. Keys are listed in sorted order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<u64, StoreError> {
        Ok(self.entries.write().await.remove(key).map_or(0, |_| 1))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let pattern = Pattern::new(pattern)
            .map_err(|e| StoreError::invalid_pattern(format!("{}: {}", pattern, e)))?;
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect())
    }
}
