// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::owner_reference::*;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

fn owner_ref(uid: &str, controller: bool) -> OwnerReference {
    OwnerReference {
        api_version: "anvil.dev/v1".to_string(),
        kind: "DeploymentVersion".to_string(),
        name: "dv".to_string(),
        uid: uid.to_string(),
        controller: Some(controller),
        block_owner_deletion: Some(true),
    }
}

#[test]
pub fn test_filter_controller_references() {
    println!("Testing filter_controller_references()...");
    let refs = vec![owner_ref("1", false), owner_ref("2", true)];
    let controllers = filter_controller_references(&refs);
    assert_eq!(1, controllers.len());
    assert_eq!("2", controllers[0].uid);
}

#[test]
pub fn test_is_controlled_by() {
    println!("Testing is_controlled_by()...");
    let object_meta = ObjectMeta {
        owner_references: Some(vec![owner_ref("1", true)]),
        ..ObjectMeta::default()
    };
    assert!(is_controlled_by(&object_meta, &owner_ref("1", true)));
    // A re-created owner with the same name has a new uid
    assert!(!is_controlled_by(&object_meta, &owner_ref("2", true)));

    let not_controller = ObjectMeta {
        owner_references: Some(vec![owner_ref("1", false)]),
        ..ObjectMeta::default()
    };
    assert!(!is_controlled_by(&not_controller, &owner_ref("1", true)));
    assert!(!is_controlled_by(&ObjectMeta::default(), &owner_ref("1", true)));
}

#[test]
pub fn test_ensure_owner_reference() {
    println!("Testing ensure_owner_reference()...");
    let mut object_meta = ObjectMeta {
        owner_references: Some(vec![owner_ref("0", false), owner_ref("1", false)]),
        ..ObjectMeta::default()
    };
    ensure_owner_reference(&mut object_meta, owner_ref("1", true));
    let refs = object_meta.owner_references.clone().unwrap_or_default();
    assert_eq!(2, refs.len());
    assert!(is_controlled_by(&object_meta, &owner_ref("1", true)));

    ensure_owner_reference(&mut object_meta, owner_ref("1", true));
    assert_eq!(2, object_meta.owner_references.unwrap_or_default().len());
}
