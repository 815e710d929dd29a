//! # Plan Indexer Pipeline
//!
//! Replicates plan mutations from the primary store into a parent-child
//! search index through a durable channel.
//!
//! ## Architecture
//!
//! 1. **Merge**: applies partial updates under an entity-tag precondition
//! 2. **Publisher**: writes operation envelopes to the channel
//! 3. **Channel**: Kafka or in-memory transport with a single in-flight delivery
//! 4. **Consumer**: applies envelopes one at a time and settles them
//! 5. **Processor**: decomposes entities into join-tagged documents and
//!    enumerates their ids
//! 6. **Loader**: writes and purges documents in the search index
//! 7. **Orchestrator**: prepares the index and runs the consumer until shutdown

pub mod channel;
pub mod consumer;
pub mod errors;
pub mod loader;
pub mod merge;
pub mod orchestrator;
pub mod processor;
pub mod publisher;

#[cfg(test)]
mod test_fixtures;

pub use errors::{ChannelError, PipelineError};
