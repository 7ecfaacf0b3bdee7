// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::object_meta::*;
use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference, Time};

#[test]
pub fn test_add_finalizer() {
    println!("Testing add_finalizer()...");
    let mut object_meta = ObjectMeta::default();
    object_meta.add_finalizer("a");
    object_meta.add_finalizer("b");
    object_meta.add_finalizer("a");
    assert_eq!(Some(vec!["a".to_string(), "b".to_string()]), object_meta.finalizers);
    assert!(object_meta.finalizers_contains("a"));
    assert!(!object_meta.finalizers_contains("c"));
}

#[test]
pub fn test_remove_finalizer() {
    println!("Testing remove_finalizer()...");
    let mut object_meta = ObjectMeta {
        finalizers: Some(vec!["a".to_string(), "b".to_string()]),
        ..ObjectMeta::default()
    };
    object_meta.remove_finalizer("a");
    assert_eq!(Some(vec!["b".to_string()]), object_meta.finalizers);
    assert!(object_meta.has_finalizers());
    object_meta.remove_finalizer("b");
    assert_eq!(None, object_meta.finalizers);
    assert!(!object_meta.has_finalizers());
    // Removing an absent finalizer is a no-op
    object_meta.remove_finalizer("b");
    assert_eq!(None, object_meta.finalizers);
}

#[test]
pub fn test_has_deletion_timestamp() {
    println!("Testing has_deletion_timestamp()...");
    let mut object_meta = ObjectMeta::default();
    assert!(!object_meta.has_deletion_timestamp());
    object_meta.deletion_timestamp = Some(Time(Utc::now()));
    assert!(object_meta.has_deletion_timestamp());
}

#[test]
pub fn test_resource_version_and_uid_eq() {
    println!("Testing resource_version_eq() and uid_eq()...");
    let object_meta = ObjectMeta {
        resource_version: Some("1".to_string()),
        uid: Some("u".to_string()),
        ..ObjectMeta::default()
    };
    let mut other = object_meta.clone();
    assert!(object_meta.resource_version_eq(&other));
    assert!(object_meta.uid_eq(&other));
    other.resource_version = Some("2".to_string());
    other.uid = None;
    assert!(!object_meta.resource_version_eq(&other));
    assert!(!object_meta.uid_eq(&other));
}

#[test]
pub fn test_controller_reference() {
    println!("Testing controller_reference()...");
    let owner = OwnerReference {
        api_version: "anvil.dev/v1".to_string(),
        kind: "DeploymentVersion".to_string(),
        name: "dv".to_string(),
        uid: "1".to_string(),
        ..OwnerReference::default()
    };
    let controller = OwnerReference {
        controller: Some(true),
        uid: "2".to_string(),
        ..owner.clone()
    };
    let object_meta = ObjectMeta {
        owner_references: Some(vec![owner.clone(), controller.clone()]),
        ..ObjectMeta::default()
    };
    assert_eq!(Some(&controller), object_meta.controller_reference());
    assert!(object_meta.owner_references_contains(&owner));
    assert_eq!(None, ObjectMeta::default().controller_reference());
}
