// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::controllers::deployment_version_controller::trusted::spec_types::*;
use crate::executable_model::api_server::*;
use crate::executable_model::api_server_state::{ApiServerState, ApiVerb};
use crate::kubernetes_api_objects::api_method::*;
use crate::kubernetes_api_objects::error::APIError;
use crate::kubernetes_api_objects::object_meta::ObjectMetaExt;
use crate::kubernetes_api_objects::resource::ResourceWrapper;
use crate::shim_layer::store::Store;
use crate::unit_tests::controllers::deployment_version_controller::{base_deployment, labels};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::api::DynamicObject;
use std::collections::BTreeMap;

fn config_map(name: &str, value: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..ObjectMeta::default()
        },
        data: Some(BTreeMap::from([("key".to_string(), value.to_string())])),
        ..ConfigMap::default()
    }
}

fn create(s: &mut ApiServerState, obj: DynamicObject) -> Result<DynamicObject, APIError> {
    let req = KubeCreateRequest {
        api_resource: ConfigMap::api_resource(),
        namespace: "default".to_string(),
        obj,
    };
    handle_create_request(&req, s).res
}

fn update<K: ResourceWrapper>(s: &mut ApiServerState, obj: &K) -> Result<DynamicObject, APIError> {
    let obj = obj.marshal().unwrap();
    let req = KubeUpdateRequest {
        api_resource: K::api_resource(),
        name: obj.metadata.name.clone().unwrap(),
        namespace: "default".to_string(),
        obj,
    };
    handle_update_request(&req, s).res
}

fn delete(s: &mut ApiServerState, name: &str, preconditions: Option<Preconditions>) -> Result<(), APIError> {
    let req = KubeDeleteRequest {
        api_resource: ConfigMap::api_resource(),
        name: name.to_string(),
        namespace: "default".to_string(),
        preconditions,
    };
    handle_delete_request(&req, s).res
}

fn get(s: &ApiServerState, name: &str) -> Result<ConfigMap, APIError> {
    let req = KubeGetRequest {
        api_resource: ConfigMap::api_resource(),
        name: name.to_string(),
        namespace: "default".to_string(),
    };
    handle_get_request(&req, s)
        .res
        .map(|obj| ConfigMap::unmarshal(obj).unwrap())
}

#[test]
pub fn test_create_assigns_identity() {
    println!("Testing handle_create_request()...");
    let mut s = ApiServerState::new();
    let first = create(&mut s, config_map("a", "1").marshal().unwrap()).unwrap();
    let second = create(&mut s, config_map("b", "1").marshal().unwrap()).unwrap();

    assert!(first.metadata.resource_version.is_some());
    assert!(first.metadata.creation_timestamp.is_some());
    assert_eq!(Some(1), first.metadata.generation);
    assert_ne!(first.metadata.uid, second.metadata.uid);
    assert_ne!(first.metadata.resource_version, second.metadata.resource_version);
    assert_eq!(2, s.resources.len());

    assert_eq!(
        Some(APIError::ObjectAlreadyExists),
        create(&mut s, config_map("a", "2").marshal().unwrap()).err()
    );
    assert_eq!(Some(&"1".to_string()), get(&s, "a").unwrap().data.unwrap().get("key"));
}

#[test]
pub fn test_create_rejects_mismatched_kind() {
    println!("Testing handle_create_request() with an object of another kind...");
    let mut s = ApiServerState::new();
    let mut obj = config_map("a", "1").marshal().unwrap();
    if let Some(types) = obj.types.as_mut() {
        types.kind = "Secret".to_string();
    }
    assert_eq!(Some(APIError::BadRequest), create(&mut s, obj).err());
}

#[test]
pub fn test_create_rejects_multiple_controllers() {
    println!("Testing handle_create_request() with two controller references...");
    let mut s = ApiServerState::new();
    let controller = |uid: &str| OwnerReference {
        api_version: "v1".to_string(),
        kind: "ConfigMap".to_string(),
        name: uid.to_string(),
        uid: uid.to_string(),
        controller: Some(true),
        block_owner_deletion: None,
    };
    let mut cm = config_map("a", "1");
    cm.metadata.owner_references = Some(vec![controller("x"), controller("y")]);
    assert_eq!(Some(APIError::Invalid), create(&mut s, cm.marshal().unwrap()).err());
    assert!(s.resources.is_empty());
}

#[test]
pub fn test_update_checks_resource_version() {
    println!("Testing handle_update_request() with a stale resource version...");
    let mut s = ApiServerState::new();
    create(&mut s, config_map("a", "1").marshal().unwrap()).unwrap();
    let stale = get(&s, "a").unwrap();

    let mut fresh = stale.clone();
    fresh.data = Some(BTreeMap::from([("key".to_string(), "2".to_string())]));
    let updated = update(&mut s, &fresh).unwrap();
    assert_ne!(stale.metadata.resource_version, updated.metadata.resource_version);

    let mut conflicting = stale;
    conflicting.data = Some(BTreeMap::from([("key".to_string(), "3".to_string())]));
    assert_eq!(Some(APIError::Conflict), update(&mut s, &conflicting).err());
    assert_eq!(Some(&"2".to_string()), get(&s, "a").unwrap().data.unwrap().get("key"));
}

#[test]
pub fn test_unconditional_update_depends_on_group() {
    println!("Testing handle_update_request() without a resource version...");
    let mut s = ApiServerState::new();
    create(&mut s, config_map("a", "1").marshal().unwrap()).unwrap();
    // Built-in kinds accept updates without a resource version
    assert!(update(&mut s, &config_map("a", "2")).is_ok());

    let dv = DeploymentVersion {
        metadata: ObjectMeta {
            name: Some("dv".to_string()),
            namespace: Some("default".to_string()),
            ..ObjectMeta::default()
        },
        ..DeploymentVersion::default()
    };
    let req = KubeCreateRequest {
        api_resource: DeploymentVersion::api_resource(),
        namespace: "default".to_string(),
        obj: dv.marshal().unwrap(),
    };
    handle_create_request(&req, &mut s).res.unwrap();
    // Custom resources do not
    assert_eq!(Some(APIError::Invalid), update(&mut s, &dv).err());
}

#[test]
pub fn test_update_rejects_identity_changes() {
    println!("Testing handle_update_request() with a mismatched name or uid...");
    let mut s = ApiServerState::new();
    create(&mut s, config_map("a", "1").marshal().unwrap()).unwrap();
    let current = get(&s, "a").unwrap();

    let mut req = KubeUpdateRequest {
        api_resource: ConfigMap::api_resource(),
        name: "b".to_string(),
        namespace: "default".to_string(),
        obj: current.marshal().unwrap(),
    };
    assert_eq!(Some(APIError::BadRequest), handle_update_request(&req, &mut s).res.err());

    req.name = "a".to_string();
    req.obj.metadata.uid = Some("another".to_string());
    assert_eq!(Some(APIError::InternalError), handle_update_request(&req, &mut s).res.err());

    assert_eq!(Some(APIError::ObjectNotFound), update(&mut s, &config_map("missing", "1")).err());
}

#[test]
pub fn test_noop_update_keeps_resource_version() {
    println!("Testing handle_update_request() with an unchanged object...");
    let mut s = ApiServerState::new();
    create(&mut s, config_map("a", "1").marshal().unwrap()).unwrap();
    let current = get(&s, "a").unwrap();
    let rv_counter = s.resource_version_counter;

    let updated = update(&mut s, &current).unwrap();
    assert_eq!(current.metadata.resource_version, updated.metadata.resource_version);
    assert_eq!(rv_counter, s.resource_version_counter);
}

#[test]
pub fn test_update_bumps_generation_on_data_change_only() {
    println!("Testing the generation bookkeeping of handle_update_request()...");
    let mut s = ApiServerState::new();
    create(&mut s, config_map("a", "1").marshal().unwrap()).unwrap();

    let mut labeled = get(&s, "a").unwrap();
    labeled.metadata.labels = Some(BTreeMap::from([("l".to_string(), "v".to_string())]));
    assert_eq!(Some(1), update(&mut s, &labeled).unwrap().metadata.generation);

    let mut changed = get(&s, "a").unwrap();
    changed.data = Some(BTreeMap::from([("key".to_string(), "2".to_string())]));
    assert_eq!(Some(2), update(&mut s, &changed).unwrap().metadata.generation);
}

#[test]
pub fn test_update_keeps_deployment_selector() {
    println!("Testing handle_update_request() on the selector of a Deployment...");
    let server = ExecutableApiServer::new();
    let created = server.seed(&base_deployment("web", 1, "nginx:1.25")).unwrap();

    let mut scaled = created.clone();
    scaled.spec.as_mut().unwrap().replicas = Some(3);
    let scaled = server.replace(&scaled).unwrap();

    let mut reselected = scaled.clone();
    let spec = reselected.spec.as_mut().unwrap();
    spec.selector.match_labels = Some(labels("web-canary"));
    spec.template.metadata.as_mut().unwrap().labels = Some(labels("web-canary"));
    assert_eq!(Some(APIError::Invalid), server.replace(&reselected).err());

    let stored = server.lookup::<Deployment>("default", "web").unwrap();
    assert_eq!(scaled.metadata.resource_version, stored.metadata.resource_version);
    assert_eq!(Some(labels("web")), stored.spec.unwrap().selector.match_labels);
}

#[test]
pub fn test_delete_waits_for_finalizers() {
    println!("Testing handle_delete_request() on an object with a finalizer...");
    let mut s = ApiServerState::new();
    let mut cm = config_map("a", "1");
    cm.metadata.finalizers = Some(vec!["test/finalizer".to_string()]);
    create(&mut s, cm.marshal().unwrap()).unwrap();

    assert_eq!(Ok(()), delete(&mut s, "a", None));
    let terminating = get(&s, "a").unwrap();
    assert!(terminating.metadata.has_deletion_timestamp());

    // Deleting again leaves the terminating object untouched
    let rv_counter = s.resource_version_counter;
    assert_eq!(Ok(()), delete(&mut s, "a", None));
    assert_eq!(rv_counter, s.resource_version_counter);

    // No new finalizer on a terminating object
    let mut more = terminating.clone();
    more.metadata.add_finalizer("test/another");
    assert_eq!(Some(APIError::Forbidden), update(&mut s, &more).err());

    let mut released = terminating;
    released.metadata.remove_finalizer("test/finalizer");
    assert!(update(&mut s, &released).is_ok());
    assert_eq!(Err(APIError::ObjectNotFound), get(&s, "a"));
}

#[test]
pub fn test_delete_checks_preconditions() {
    println!("Testing handle_delete_request() with preconditions...");
    let mut s = ApiServerState::new();
    let created = create(&mut s, config_map("a", "1").marshal().unwrap()).unwrap();

    let wrong_uid = Preconditions {
        uid: Some("another".to_string()),
        resource_version: None,
    };
    assert_eq!(Err(APIError::Conflict), delete(&mut s, "a", Some(wrong_uid)));
    let wrong_rv = Preconditions {
        uid: None,
        resource_version: Some("stale".to_string()),
    };
    assert_eq!(Err(APIError::Conflict), delete(&mut s, "a", Some(wrong_rv)));
    assert!(get(&s, "a").is_ok());

    let matching = Preconditions {
        uid: created.metadata.uid.clone(),
        resource_version: created.metadata.resource_version.clone(),
    };
    assert_eq!(Ok(()), delete(&mut s, "a", Some(matching)));
    assert_eq!(Err(APIError::ObjectNotFound), get(&s, "a"));
    assert_eq!(Err(APIError::ObjectNotFound), delete(&mut s, "a", None));
}

fn status(message: &str) -> DeploymentVersionStatus {
    DeploymentVersionStatus {
        observed_generation: Some(1),
        derived_deployment: None,
        conditions: vec![DeploymentVersionCondition {
            type_: "Ready".to_string(),
            status: "False".to_string(),
            reason: None,
            message: Some(message.to_string()),
        }],
    }
}

#[tokio::test]
pub async fn test_status_is_a_separate_subresource() {
    println!("Testing that updates and status updates touch disjoint parts...");
    let server = ExecutableApiServer::new();
    let dv = server
        .seed(&DeploymentVersion {
            metadata: ObjectMeta {
                name: Some("dv".to_string()),
                namespace: Some("default".to_string()),
                ..ObjectMeta::default()
            },
            ..DeploymentVersion::default()
        })
        .unwrap();
    let api_resource = DeploymentVersion::api_resource();

    // A status update ignores changes to the spec
    let mut with_status = dv.clone();
    with_status.spec.base_name = "ignored".to_string();
    with_status.status = Some(status("first"));
    server
        .update_status(&api_resource, "default", "dv", &with_status.marshal().unwrap())
        .await
        .unwrap();
    let stored = server.lookup::<DeploymentVersion>("default", "dv").unwrap();
    assert_eq!("", stored.spec.base_name);
    assert_eq!(Some(status("first")), stored.status);
    assert_eq!(Some(1), stored.metadata.generation);

    // An update ignores changes to the status
    let mut with_spec = stored;
    with_spec.spec.base_name = "web".to_string();
    with_spec.status = Some(status("second"));
    server
        .update(&api_resource, "default", "dv", &with_spec.marshal().unwrap())
        .await
        .unwrap();
    let stored = server.lookup::<DeploymentVersion>("default", "dv").unwrap();
    assert_eq!("web", stored.spec.base_name);
    assert_eq!(Some(status("first")), stored.status);
    assert_eq!(Some(2), stored.metadata.generation);

    assert_eq!(1, server.count_writes(ApiVerb::UpdateStatus, "DeploymentVersion"));
    assert_eq!(1, server.count_writes(ApiVerb::Update, "DeploymentVersion"));
}

#[tokio::test]
pub async fn test_store_records_failed_writes() {
    println!("Testing the write history of ExecutableApiServer...");
    let server = ExecutableApiServer::new();
    let api_resource = ConfigMap::api_resource();
    let obj = config_map("a", "1").marshal().unwrap();
    server.create(&api_resource, "default", &obj).await.unwrap();
    assert_eq!(
        Err(APIError::ObjectAlreadyExists),
        server.create(&api_resource, "default", &obj).await.map(|_| ())
    );

    let history = server.history();
    assert_eq!(2, history.len());
    assert!(history[0].res.is_ok());
    assert_eq!(Err(APIError::ObjectAlreadyExists), history[1].res);
    assert_eq!(1, server.count_writes(ApiVerb::Create, "ConfigMap"));

    // Reads and user-side writes are not recorded
    server.get(&api_resource, "default", "a").await.unwrap();
    server.remove::<ConfigMap>("default", "a").unwrap();
    assert_eq!(2, server.history().len());
    server.clear_history();
    assert!(server.history().is_empty());
}
