//! Partial updates guarded by entity tags.

mod fingerprint;
mod merger;

pub use fingerprint::fingerprint;
pub use merger::{ConcurrencyMerger, KEYED_ARRAY_FIELD};
