//! Interface definitions for the search index and the primary store.
//!
//! Both collaborators sit behind traits so that backends can be swapped and
//! the pipeline can be tested against in-memory implementations.

mod key_value_store;
mod search_index_provider;

pub use key_value_store::KeyValueStore;
pub use search_index_provider::SearchIndexProvider;
