//! Concurrency tokens.

use sha2::{Digest, Sha256};

/// Strong entity tag of a serialized entity: a quoted SHA-256 hex digest.
///
/// Tokens are compared byte-for-byte, so the input must be the canonical
/// serialization the entity is stored with.
pub fn fingerprint(serialized: &str) -> String {
    let hash = Sha256::digest(serialized.as_bytes());
    format!("\"{}\"", hex::encode(hash))
}
