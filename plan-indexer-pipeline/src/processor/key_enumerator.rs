//! Identifier enumeration.
//!
//! Collects every `objectId` in an entity graph so that all of the entity's
//! documents can be purged from the search index. Walks the tree exactly like
//! the [`Decomposer`](super::Decomposer) does.

use plan_indexer_shared::{object_id_of, Entity, Fields, Node};

/// Lists the identifiers belonging to an entity.
#[derive(Debug, Clone, Default)]
pub struct KeyEnumerator;

impl KeyEnumerator {
    pub fn new() -> Self {
        Self
    }

    /// All `objectId`s of the entity, children before their enclosing object.
    pub fn enumerate_ids(&self, entity: &Entity) -> Vec<String> {
        let mut ids = Vec::new();
        collect_object(entity.fields(), &mut ids);
        ids
    }
}

fn collect_object(fields: &Fields, ids: &mut Vec<String>) {
    for node in fields.values() {
        collect_node(node, ids);
    }
    if let Some(object_id) = object_id_of(fields) {
        ids.push(object_id);
    }
}

fn collect_node(node: &Node, ids: &mut Vec<String>) {
    match node {
        Node::Object(fields) => collect_object(fields, ids),
        Node::Array(items) => {
            for item in items {
                collect_node(item, ids);
            }
        }
        Node::Scalar(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::Decomposer;
    use crate::test_fixtures::{sample_plan, small_plan, PLAN_ID};
    use serde_json::json;
    use std::collections::BTreeSet;

    /// The right-hand side of every composite key the decomposer produces.
    fn decomposed_ids(entity: &Entity) -> BTreeSet<String> {
        Decomposer::new()
            .decompose(entity)
            .values()
            .map(|doc| doc.object_id.clone())
            .collect()
    }

    fn enumerated_ids(entity: &Entity) -> BTreeSet<String> {
        KeyEnumerator::new().enumerate_ids(entity).into_iter().collect()
    }

    #[test]
    fn test_enumerate_sample_plan() {
        let ids = KeyEnumerator::new().enumerate_ids(&sample_plan());

        assert_eq!(ids.len(), 8);
        // The root closes the walk.
        assert_eq!(ids.last().map(String::as_str), Some(PLAN_ID));
        assert!(ids.contains(&"1234520xvc30sfs-505".to_string()));
    }

    #[test]
    fn test_children_come_before_parent() {
        let ids = KeyEnumerator::new().enumerate_ids(&sample_plan());
        let position = |id: &str| ids.iter().position(|x| x == id).unwrap();

        assert!(position("1234520xvc30asdf-502") < position("27283xvx9asdff-504"));
        assert!(position("1234512xvc1314sdfsd-506") < position("27283xvx9sdf-507"));
    }

    #[test]
    fn test_enumeration_is_restartable() {
        let enumerator = KeyEnumerator::new();
        let plan = sample_plan();
        assert_eq!(enumerator.enumerate_ids(&plan), enumerator.enumerate_ids(&plan));
    }

    #[test]
    fn test_matches_decomposer_on_fixtures() {
        for entity in [sample_plan(), small_plan("p1"), Entity::default()] {
            assert_eq!(enumerated_ids(&entity), decomposed_ids(&entity));
        }
    }

    #[test]
    fn test_matches_decomposer_on_irregular_shapes() {
        let shapes = vec![
            json!({
                "objectId": "root",
                "meta": { "owner": { "objectId": "o1" }, "flags": [true, false] },
                "matrix": [[{ "objectId": "m1" }, { "objectId": "m2", "inner": { "objectId": "m3" } }]],
                "group": { "objectId": "g", "0": { "objectId": "x" }, "12": { "objectId": "y" } }
            }),
            json!({ "objectId": 7, "child": { "objectId": 8 } }),
            json!({ "noId": { "objectId": "orphan" } }),
            json!({ "objectId": "", "child": { "objectId": "c" } }),
        ];

        for shape in shapes {
            let entity = Entity::from_value(shape).unwrap();
            assert_eq!(enumerated_ids(&entity), decomposed_ids(&entity));
        }
    }

    #[test]
    fn test_matches_decomposer_on_generated_trees() {
        // Deterministic fan-out trees of increasing depth and width.
        fn build(prefix: &str, depth: usize, width: usize) -> serde_json::Value {
            let mut object = serde_json::Map::new();
            object.insert("objectId".into(), json!(prefix));
            object.insert("objectType".into(), json!("node"));
            if depth > 0 {
                let children: Vec<_> = (0..width)
                    .map(|i| build(&format!("{}.{}", prefix, i), depth - 1, width))
                    .collect();
                object.insert("items".into(), json!(children));
                object.insert(
                    "single".into(),
                    build(&format!("{}.s", prefix), depth - 1, 1),
                );
            }
            serde_json::Value::Object(object)
        }

        for depth in 0..4 {
            for width in 1..4 {
                let entity = Entity::from_value(build("r", depth, width)).unwrap();
                let enumerated = enumerated_ids(&entity);
                assert_eq!(enumerated, decomposed_ids(&entity));
                assert_eq!(
                    enumerated.len(),
                    KeyEnumerator::new().enumerate_ids(&entity).len()
                );
            }
        }
    }
}
