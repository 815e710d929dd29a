//! # Plan Indexer Shared
//!
//! Types shared between the write path, the replication pipeline and the
//! search index repository:
//!
//! - [`Node`] / [`Entity`]: the nested plan graph as stored in the primary store
//! - [`SubDocument`] / [`JoinRelation`]: the flat, join-tagged index documents
//! - [`OperationEnvelope`]: the durable message carried by the change channel

mod document;
mod envelope;
mod node;

pub use document::{JoinRelation, SubDocument};
pub use envelope::{Operation, OperationEnvelope};
pub use node::{object_id_of, Entity, EntityError, Fields, Node, Scalar, OBJECT_ID, OBJECT_TYPE};
