// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use super::*;
use crate::controllers::deployment_version_controller::exec::merge::*;
use k8s_openapi::api::apps::v1::{DeploymentStrategy, RollingUpdateDeployment};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde_json::json;

#[test]
pub fn test_empty_overlay_copies_base() {
    println!("Testing merge_deployment_spec() with an empty overlay...");
    let base = deployment_spec("web", 3, "a");
    let merged = merge_deployment_spec(&base, &DeploymentSpecOverlay::default());
    assert_eq!(base, merged);
}

#[test]
pub fn test_overlay_replaces_set_fields_only() {
    println!("Testing merge_deployment_spec() with scalar fields...");
    let mut base = deployment_spec("web", 3, "a");
    base.min_ready_seconds = Some(5);
    base.paused = Some(false);
    let overlay = DeploymentSpecOverlay {
        replicas: Some(7),
        paused: Some(true),
        ..DeploymentSpecOverlay::default()
    };
    let merged = merge_deployment_spec(&base, &overlay);
    assert_eq!(Some(7), merged.replicas);
    assert_eq!(Some(true), merged.paused);
    assert_eq!(Some(5), merged.min_ready_seconds);
    assert_eq!(base.selector, merged.selector);
    assert_eq!(base.template, merged.template);
}

#[test]
pub fn test_overlay_image_keeps_base_replicas() {
    println!("Testing merge_deployment_spec() with a container overlay...");
    let base = deployment_spec("web", 3, "a");
    let merged = merge_deployment_spec(&base, &image_overlay("web", "b"));
    assert_eq!(Some(3), merged.replicas);
    let containers = merged.template.spec.unwrap().containers;
    assert_eq!(1, containers.len());
    assert_eq!(Some("b".to_string()), containers[0].image);
    // Template labels come from the base since the overlay sets no metadata
    assert_eq!(Some(labels("web")), merged.template.metadata.unwrap().labels);
}

#[test]
pub fn test_overlay_merges_maps_key_by_key() {
    println!("Testing merge_deployment_spec() with map fields...");
    let mut base = deployment_spec("web", 3, "a");
    if let Some(pod_spec) = base.template.spec.as_mut() {
        pod_spec.node_selector = Some(BTreeMap::from([
            ("disk".to_string(), "hdd".to_string()),
            ("zone".to_string(), "a".to_string()),
        ]));
    }
    let overlay = DeploymentSpecOverlay {
        template: Some(PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: Some(BTreeMap::from([("track".to_string(), "canary".to_string())])),
                ..ObjectMeta::default()
            }),
            spec: Some(PodSpec {
                node_selector: Some(BTreeMap::from([("disk".to_string(), "ssd".to_string())])),
                ..PodSpec::default()
            }),
        }),
        ..DeploymentSpecOverlay::default()
    };
    let merged = merge_deployment_spec(&base, &overlay);

    let template_labels = merged.template.metadata.unwrap().labels.unwrap();
    assert_eq!(Some(&"web".to_string()), template_labels.get("app"));
    assert_eq!(Some(&"canary".to_string()), template_labels.get("track"));

    let pod_spec = merged.template.spec.unwrap();
    let node_selector = pod_spec.node_selector.unwrap();
    assert_eq!(Some(&"ssd".to_string()), node_selector.get("disk"));
    assert_eq!(Some(&"a".to_string()), node_selector.get("zone"));
    // An overlay without containers keeps the base containers
    assert_eq!(Some("a".to_string()), pod_spec.containers[0].image);
}

#[test]
pub fn test_overlay_recurses_into_strategy() {
    println!("Testing merge_deployment_spec() with a nested strategy...");
    let mut base = deployment_spec("web", 3, "a");
    base.strategy = Some(DeploymentStrategy {
        type_: Some("RollingUpdate".to_string()),
        rolling_update: Some(RollingUpdateDeployment {
            max_surge: Some(IntOrString::Int(1)),
            max_unavailable: Some(IntOrString::Int(0)),
        }),
    });
    let overlay = DeploymentSpecOverlay {
        strategy: Some(DeploymentStrategy {
            type_: None,
            rolling_update: Some(RollingUpdateDeployment {
                max_surge: Some(IntOrString::String("50%".to_string())),
                max_unavailable: None,
            }),
        }),
        ..DeploymentSpecOverlay::default()
    };
    let strategy = merge_deployment_spec(&base, &overlay).strategy.unwrap();
    assert_eq!(Some("RollingUpdate".to_string()), strategy.type_);
    let rolling_update = strategy.rolling_update.unwrap();
    assert_eq!(Some(IntOrString::String("50%".to_string())), rolling_update.max_surge);
    assert_eq!(Some(IntOrString::Int(0)), rolling_update.max_unavailable);
}

#[test]
pub fn test_overlay_replaces_match_expressions() {
    println!("Testing merge_deployment_spec() with a selector...");
    let base = deployment_spec("web", 3, "a");
    let overlay = DeploymentSpecOverlay {
        selector: Some(LabelSelector {
            match_labels: Some(BTreeMap::from([("tier".to_string(), "front".to_string())])),
            match_expressions: Some(vec![]),
        }),
        ..DeploymentSpecOverlay::default()
    };
    let selector = merge_deployment_spec(&base, &overlay).selector;
    let match_labels = selector.match_labels.unwrap();
    assert_eq!(2, match_labels.len());
    assert_eq!(Some(vec![]), selector.match_expressions);
}

#[test]
pub fn test_validate_deployment_spec() {
    println!("Testing validate_deployment_spec()...");
    assert_eq!(Ok(()), validate_deployment_spec(&deployment_spec("web", 3, "a")));

    let negative = DeploymentSpec {
        replicas: Some(-1),
        ..deployment_spec("web", 3, "a")
    };
    assert_eq!(Err(MergeError::NegativeReplicas(-1)), validate_deployment_spec(&negative));

    let mut mismatch = deployment_spec("web", 3, "a");
    mismatch.selector.match_labels = Some(labels("api"));
    assert_eq!(
        Err(MergeError::SelectorMismatch {
            key: "app".to_string(),
            value: "api".to_string()
        }),
        validate_deployment_spec(&mismatch)
    );

    let mut empty = deployment_spec("web", 3, "a");
    empty.template.spec = Some(PodSpec::default());
    assert_eq!(Err(MergeError::NoContainers), validate_deployment_spec(&empty));
}

#[test]
pub fn test_is_subset() {
    println!("Testing is_subset()...");
    let desired = json!({"replicas": 3, "template": {"spec": {"containers": [{"name": "web", "image": "b"}]}}});
    let defaulted = json!({
        "replicas": 3,
        "revisionHistoryLimit": 10,
        "template": {"spec": {"containers": [{"name": "web", "image": "b", "imagePullPolicy": "IfNotPresent"}]}}
    });
    assert!(is_subset(&desired, &defaulted));

    let drifted = json!({"replicas": 3, "template": {"spec": {"containers": [{"name": "web", "image": "a"}]}}});
    assert!(!is_subset(&desired, &drifted));

    let extra_container = json!({"replicas": 3, "template": {"spec": {"containers": [
        {"name": "web", "image": "b"},
        {"name": "sidecar", "image": "s"}
    ]}}});
    assert!(!is_subset(&desired, &extra_container));

    assert!(!is_subset(&json!({"paused": true}), &json!({})));
    assert!(is_subset(&json!({"paused": null}), &json!({})));
}
