//! In-memory implementations of the repository interfaces.

mod store;

pub use store::MemoryStore;
