//! # Plan Indexer Repository
//!
//! This crate provides traits and implementations for the two stores the plan
//! indexer talks to: the search index that holds the join-tagged plan
//! documents, and the primary key-value store that holds serialized plans.
//! It includes definitions for errors, interfaces, an OpenSearch
//! implementation of the search index and an in-memory primary store.

pub mod client;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod types;

pub use client::SearchIndexClient;
pub use config::SearchIndexConfig;
pub use errors::{SearchIndexError, StoreError};
pub use interfaces::{KeyValueStore, SearchIndexProvider};
pub use memory::MemoryStore;
pub use opensearch::OpenSearchClient;
pub use types::{BatchOperationSummary, DeleteDocumentRequest, IndexDocumentRequest};
