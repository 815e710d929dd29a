//! # Plan Indexer
//!
//! Stores plans in the primary key-value store and keeps the search index in
//! step with them through the replication pipeline.
//!
//! This crate provides the configuration, dependency wiring and logging setup
//! for the indexer binary, and the [`PlanService`] write path that publishes
//! every mutation.

pub mod config;
pub mod observability;
pub mod service;

pub use config::{Dependencies, Settings};
pub use service::{Fetched, PlanService, ServiceError};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] plan_indexer_pipeline::PipelineError),

    /// Search index error.
    #[error("Search index error: {0}")]
    SearchIndexError(#[from] plan_indexer_repository::SearchIndexError),
}

impl IndexerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
