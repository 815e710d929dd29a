//! Consumer module for the plan indexer pipeline.
//!
//! Drains the durable channel into the search index.

mod change_consumer;

pub use change_consumer::{ChangeConsumer, ConsumerState, ConsumerStats, Settlement};
