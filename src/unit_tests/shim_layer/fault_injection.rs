// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::executable_model::api_server::ExecutableApiServer;
use crate::shim_layer::fault_injection::*;
use crate::Error;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

fn seed_config(server: &ExecutableApiServer, data: &[(&str, &str)]) {
    let config_map = ConfigMap {
        metadata: ObjectMeta {
            name: Some(FAULT_INJECTION_CONFIG_NAME.to_string()),
            namespace: Some(FAULT_INJECTION_CONFIG_NAMESPACE.to_string()),
            ..ObjectMeta::default()
        },
        data: Some(
            data.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<String, String>>(),
        ),
        ..ConfigMap::default()
    };
    server.seed(&config_map).unwrap();
}

fn current(server: &ExecutableApiServer) -> Option<String> {
    server
        .lookup::<ConfigMap>(FAULT_INJECTION_CONFIG_NAMESPACE, FAULT_INJECTION_CONFIG_NAME)
        .and_then(|cm| cm.data)
        .and_then(|data| data.get("current").cloned())
}

#[tokio::test]
pub async fn test_missing_config_continues() {
    println!("Testing crash_or_continue() without a fault injection config...");
    let server = ExecutableApiServer::new();
    assert!(crash_or_continue(&server, "DeploymentVersion/default/dv", "test:").await.is_ok());
    assert!(server.history().is_empty());
}

#[tokio::test]
pub async fn test_malformed_config_continues() {
    println!("Testing crash_or_continue() with an unparsable counter...");
    let server = ExecutableApiServer::new();
    seed_config(&server, &[("current", "zero"), ("expected", "0")]);
    assert!(crash_or_continue(&server, "DeploymentVersion/default/dv", "test:").await.is_ok());
    assert_eq!(Some("zero".to_string()), current(&server));
}

#[tokio::test]
pub async fn test_crash_at_expected_write() {
    println!("Testing crash_or_continue() counting up to the expected write...");
    let server = ExecutableApiServer::new();
    seed_config(&server, &[("current", "0"), ("expected", "2")]);

    assert!(crash_or_continue(&server, "DeploymentVersion/default/dv", "test:").await.is_ok());
    assert!(crash_or_continue(&server, "DeploymentVersion/default/dv", "test:").await.is_ok());
    let err = crash_or_continue(&server, "DeploymentVersion/default/dv", "test:")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InjectedFault(_)));
    assert_eq!(Some("3".to_string()), current(&server));

    // Only one write crashes
    assert!(crash_or_continue(&server, "DeploymentVersion/default/dv", "test:").await.is_ok());
    assert_eq!(Some("4".to_string()), current(&server));
}
