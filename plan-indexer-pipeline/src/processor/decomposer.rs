//! Entity decomposition.
//!
//! Flattens a nested plan into one [`SubDocument`] per identifiable object
//! node, tagging each with its join relation so the search index can rebuild
//! the parent-child hierarchy.

use std::collections::BTreeMap;

use tracing::debug;

use plan_indexer_shared::{object_id_of, Entity, Fields, JoinRelation, Node, SubDocument};

/// Relation name of the top-level plan document.
pub const ROOT_RELATION: &str = "plan";

/// Relation given to objects held under an array-index key.
pub const LINKED_SERVICES_RELATION: &str = "linkedPlanServices";

/// Sub-documents keyed by composite id `{parent_id}:{object_id}`.
pub type Decomposition = BTreeMap<String, SubDocument>;

/// Where an object node sits relative to its enclosing object.
#[derive(Debug, Clone, Copy)]
enum Position<'a> {
    Root,
    Field(&'a str),
}

/// Splits an entity into join-tagged sub-documents.
///
/// The decomposer holds no per-call state; independent entities can be
/// decomposed concurrently from a shared instance.
#[derive(Debug, Clone)]
pub struct Decomposer {
    root_relation: String,
}

impl Decomposer {
    pub fn new() -> Self {
        Self::with_root_relation(ROOT_RELATION)
    }

    /// Use a different relation name for the top-level document.
    pub fn with_root_relation(root_relation: impl Into<String>) -> Self {
        Self {
            root_relation: root_relation.into(),
        }
    }

    /// Decompose an entity into its sub-documents.
    ///
    /// Emits exactly one document per object node carrying an `objectId`.
    /// Duplicate `objectId`s under the same parent overwrite one another.
    pub fn decompose(&self, entity: &Entity) -> Decomposition {
        let root_id = entity.object_id().unwrap_or_default();
        let mut documents = Decomposition::new();

        self.decompose_object(entity.fields(), "", Position::Root, &root_id, &mut documents);

        debug!(
            root_id = %root_id,
            documents = documents.len(),
            "Decomposed entity"
        );
        documents
    }

    fn decompose_object(
        &self,
        fields: &Fields,
        immediate_parent_id: &str,
        position: Position<'_>,
        root_id: &str,
        documents: &mut Decomposition,
    ) {
        let object_id = object_id_of(fields);
        // Objects without an id are not indexed; their children attach to the
        // nearest identified ancestor.
        let children_parent_id = object_id.as_deref().unwrap_or(immediate_parent_id);

        let mut attributes = BTreeMap::new();
        for (key, node) in fields {
            match node {
                Node::Scalar(value) => {
                    attributes.insert(key.clone(), value.clone());
                }
                Node::Object(child) => self.decompose_object(
                    child,
                    children_parent_id,
                    Position::Field(key.as_str()),
                    root_id,
                    documents,
                ),
                Node::Array(items) => {
                    self.decompose_array(items, children_parent_id, key, root_id, documents)
                }
            }
        }

        let Some(object_id) = object_id else {
            return;
        };

        let join = self.join_relation(immediate_parent_id, position, root_id);
        let document = SubDocument::new(join.parent.clone(), object_id, attributes, join);
        documents.insert(document.id.clone(), document);
    }

    /// Array elements take the array's field key as their relation name.
    fn decompose_array(
        &self,
        items: &[Node],
        immediate_parent_id: &str,
        field_name: &str,
        root_id: &str,
        documents: &mut Decomposition,
    ) {
        for item in items {
            match item {
                Node::Object(fields) => self.decompose_object(
                    fields,
                    immediate_parent_id,
                    Position::Field(field_name),
                    root_id,
                    documents,
                ),
                Node::Array(nested) => {
                    self.decompose_array(nested, immediate_parent_id, field_name, root_id, documents)
                }
                Node::Scalar(_) => {}
            }
        }
    }

    fn join_relation(
        &self,
        immediate_parent_id: &str,
        position: Position<'_>,
        root_id: &str,
    ) -> JoinRelation {
        match position {
            Position::Root => JoinRelation::new(self.root_relation.as_str(), ""),
            // Index-keyed objects are hoisted directly under the root.
            Position::Field(key) if is_index_key(key) => {
                JoinRelation::new(LINKED_SERVICES_RELATION, root_id)
            }
            Position::Field(key) => JoinRelation::new(key, immediate_parent_id),
        }
    }
}

impl Default for Decomposer {
    fn default() -> Self {
        Self::new()
    }
}

/// A non-negative integer string, as produced by array positions.
fn is_index_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}
