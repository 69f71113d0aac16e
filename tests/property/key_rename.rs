// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service key rename is a bijection on the two namespaced keys, and refuses
//! documents that carry both forms of a key

use proptest::prelude::*;
use serde_json::{Map, Value};

use service_intent::store::{
    to_external_keys, to_internal_keys, ArtifactStore, ArtifactTarget, PersistenceError,
};

const RESERVED: [&str; 4] = ["site-service:sites", "vpn-service:vpns", "sites", "vpns"];

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
    ]
}

/// Object with arbitrary non-reserved keys
fn other_keys() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z:_-]{1,16}", leaf(), 0..6).prop_map(|entries| {
        entries
            .into_iter()
            .filter(|(key, _)| !RESERVED.contains(&key.as_str()))
            .collect()
    })
}

fn external_document() -> impl Strategy<Value = Value> {
    (
        other_keys(),
        prop::option::of(leaf()),
        prop::option::of(leaf()),
    )
        .prop_map(|(mut map, sites, vpns)| {
            if let Some(sites) = sites {
                map.insert("site-service:sites".to_string(), sites);
            }
            if let Some(vpns) = vpns {
                map.insert("vpn-service:vpns".to_string(), vpns);
            }
            Value::Object(map)
        })
}

/// Document carrying one collection under both its namespaced and plain key
fn colliding_document() -> impl Strategy<Value = (Value, &'static str)> {
    (
        other_keys(),
        prop_oneof![
            Just(("site-service:sites", "sites")),
            Just(("vpn-service:vpns", "vpns")),
        ],
        leaf(),
        leaf(),
    )
        .prop_map(|(mut map, (external, internal), first, second)| {
            map.insert(external.to_string(), first);
            map.insert(internal.to_string(), second);
            (Value::Object(map), external)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: external → internal → external is the identity
    #[test]
    fn prop_rename_round_trips(document in external_document()) {
        let internal = to_internal_keys(document.clone()).unwrap();
        let round_tripped = to_external_keys(internal).unwrap();
        prop_assert_eq!(round_tripped, document);
    }

    /// Property: only the two namespaced keys change
    #[test]
    fn prop_other_keys_untouched(others in other_keys()) {
        let document = Value::Object(others.clone());
        prop_assert_eq!(to_internal_keys(document.clone()).unwrap(), document.clone());
        prop_assert_eq!(to_external_keys(document.clone()).unwrap(), document);
    }

    /// Property: internal documents never carry namespaced collection keys
    #[test]
    fn prop_internal_form_is_plain(document in external_document()) {
        let internal = to_internal_keys(document).unwrap();
        let map = internal.as_object().unwrap();
        prop_assert!(!map.contains_key("site-service:sites"));
        prop_assert!(!map.contains_key("vpn-service:vpns"));
    }

    /// Property: both key forms together are refused in either direction
    #[test]
    fn prop_collisions_are_refused((document, external) in colliding_document()) {
        match to_internal_keys(document.clone()) {
            Err(PersistenceError::KeyCollision { key, .. }) => prop_assert_eq!(key, external),
            other => prop_assert!(false, "expected collision, got {:?}", other),
        }
        let refused = matches!(
            to_external_keys(document),
            Err(PersistenceError::KeyCollision { .. })
        );
        prop_assert!(refused);
    }

    /// Property: a colliding service document is never stored
    #[test]
    fn prop_colliding_service_document_not_stored((document, _) in colliding_document()) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let result = tokio_test::block_on(store.write(&ArtifactTarget::Service, &document));

        let refused = matches!(result, Err(PersistenceError::KeyCollision { .. }));
        prop_assert!(refused);
        prop_assert!(!store.path_for(&ArtifactTarget::Service).unwrap().exists());
    }
}
