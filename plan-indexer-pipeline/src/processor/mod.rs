//! Processor module for the plan indexer pipeline.
//!
//! Turns entities into the documents to write and the ids to purge.

mod decomposer;
mod key_enumerator;

pub use decomposer::{Decomposer, Decomposition, LINKED_SERVICES_RELATION, ROOT_RELATION};
pub use key_enumerator::KeyEnumerator;
