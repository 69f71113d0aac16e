// Copyright (c) 2025 - Cowboy AI, Inc.
//! write(target, D); read(target) == D

use proptest::prelude::*;
use serde_json::{json, Value};

use service_intent::store::{ArtifactStore, ArtifactTarget, BaselineKind};

fn target() -> impl Strategy<Value = ArtifactTarget> {
    prop_oneof![
        Just(ArtifactTarget::Service),
        Just(ArtifactTarget::Routing),
        Just(ArtifactTarget::Switching),
        (prop_oneof![Just(BaselineKind::Vrf), Just(BaselineKind::Vlan)], "[a-z]{2,6}-[0-9]{2}")
            .prop_map(|(kind, device)| ArtifactTarget::Baseline { kind, device }),
    ]
}

fn document() -> impl Strategy<Value = Value> {
    (
        prop::collection::vec((0i64..4096, "[A-Za-z]{1,10}"), 0..5),
        prop::collection::vec("[A-Za-z0-9]{1,10}", 0..4),
    )
        .prop_map(|(vpns, roles)| {
            json!({
                "site-service:sites": [],
                "vpn-service:vpns": vpns
                    .into_iter()
                    .map(|(id, name)| json!({"id": id, "name": name, "sites": ["DC"]}))
                    .collect::<Vec<_>>(),
                "device_roles": roles,
            })
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: reading a target returns exactly what was written to it
    #[test]
    fn prop_write_then_read_is_identity(target in target(), document in document()) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let read_back = tokio_test::block_on(async {
            store.write(&target, &document).await.unwrap();
            store.read(&target).await.unwrap()
        });

        prop_assert_eq!(read_back, document);
    }

    /// Property: the last write wins
    #[test]
    fn prop_overwrite_replaces(first in document(), second in document()) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let read_back = tokio_test::block_on(async {
            store.write(&ArtifactTarget::Routing, &first).await.unwrap();
            store.write(&ArtifactTarget::Routing, &second).await.unwrap();
            store.read(&ArtifactTarget::Routing).await.unwrap()
        });

        prop_assert_eq!(read_back, second);
    }
}
