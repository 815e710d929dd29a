//! Property tests over generated plan trees.

use std::collections::BTreeSet;

use plan_indexer_pipeline::merge::{fingerprint, ConcurrencyMerger, KEYED_ARRAY_FIELD};
use plan_indexer_pipeline::processor::{Decomposer, KeyEnumerator};
use plan_indexer_shared::Entity;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Field names: plain words, array-index keys and negative-number keys.
fn field_name() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-z]{1,8}",
        1 => (0u8..20).prop_map(|n| n.to_string()),
        1 => (1u8..5).prop_map(|n| format!("-{}", n)),
    ]
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[a-z ]{0,6}".prop_map(Value::from),
    ]
}

/// Objects flagged for an id carry an empty `objectId` placeholder, filled
/// with a unique value by [`assign_ids`].
fn object_of(inner: impl Strategy<Value = Value>) -> impl Strategy<Value = Value> {
    (
        prop::collection::btree_map(field_name(), inner, 0..4),
        any::<bool>(),
    )
        .prop_map(|(fields, identified)| {
            let mut object: Map<String, Value> = fields.into_iter().collect();
            if identified {
                object.insert("objectId".into(), json!(""));
                object.insert("objectType".into(), json!("node"));
            }
            Value::Object(object)
        })
}

fn tree() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(4, 64, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            object_of(inner),
        ]
    })
}

fn plan_tree() -> impl Strategy<Value = Value> {
    object_of(tree()).prop_map(|mut root| {
        let mut next = 0;
        assign_ids(&mut root, &mut next);
        root
    })
}

fn assign_ids(value: &mut Value, next: &mut usize) {
    match value {
        Value::Object(object) => {
            if let Some(id) = object.get_mut("objectId") {
                *id = json!(format!("id-{}", next));
                *next += 1;
            }
            for child in object.values_mut() {
                assign_ids(child, next);
            }
        }
        Value::Array(items) => {
            for item in items {
                assign_ids(item, next);
            }
        }
        _ => {}
    }
}

fn service(id: u8) -> Value {
    json!({ "objectId": format!("s{}", id), "objectType": "planservice", "copay": id })
}

proptest! {
    #[test]
    fn enumerated_ids_match_decomposed_ids(value in plan_tree()) {
        let entity = Entity::from_value(value).unwrap();

        let enumerated: BTreeSet<String> =
            KeyEnumerator::new().enumerate_ids(&entity).into_iter().collect();
        let decomposed: BTreeSet<String> = Decomposer::new()
            .decompose(&entity)
            .values()
            .map(|doc| doc.object_id.clone())
            .collect();

        prop_assert_eq!(enumerated, decomposed);
    }

    #[test]
    fn merged_services_are_existing_plus_unmatched(
        existing_ids in prop::collection::btree_set(0u8..16, 0..8),
        patch_ids in prop::collection::btree_set(0u8..16, 0..8),
        anonymous in 0usize..3,
    ) {
        let existing = Entity::from_value(json!({
            "objectId": "p1",
            "objectType": "plan",
            (KEYED_ARRAY_FIELD): existing_ids.iter().map(|id| service(*id)).collect::<Vec<_>>(),
        }))
        .unwrap();
        let mut updates: Vec<Value> = patch_ids.iter().map(|id| service(*id)).collect();
        updates.extend((0..anonymous).map(|_| json!({ "note": "draft" })));
        let patch = Entity::from_value(json!({ (KEYED_ARRAY_FIELD): updates })).unwrap();
        let token = fingerprint(&existing.to_json().unwrap());

        let merged = ConcurrencyMerger::new()
            .merge(&existing, &token, &patch, Some(&token))
            .unwrap();

        let services = merged.get(KEYED_ARRAY_FIELD).unwrap().as_array().unwrap();
        let unmatched = patch_ids.difference(&existing_ids).count();
        prop_assert_eq!(services.len(), existing_ids.len() + unmatched + anonymous);

        // Existing elements keep their positions.
        for (index, id) in existing_ids.iter().enumerate() {
            prop_assert_eq!(services[index].object_id(), Some(format!("s{}", id)));
        }
    }
}
