// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::controllers::deployment_version_controller::trusted::spec_types::DeploymentVersion;
use k8s_openapi::api::apps::v1::Deployment;

/// The finalizer guarding cleanup of the derived Deployment.
pub const FINALIZER: &str = "deploymentversions.anvil.dev/cleanup";

/// Label stamped on every derived Deployment, valued with the DeploymentVersion name.
pub const VERSION_LABEL: &str = "anvil.dev/deployment-version";

pub const READY_CONDITION: &str = "Ready";

/// Annotation on the derived Deployment holding the spec it was last written with.
pub const LAST_APPLIED_ANNOTATION: &str = "anvil.dev/last-applied-spec";

pub fn derived_deployment_name(dv_name: &str) -> String {
    format!("{}-version", dv_name)
}

/// Returns the namespace and name of the base Deployment, or None if the
/// DeploymentVersion has no namespace to default to.
pub fn base_deployment_key(dv: &DeploymentVersion) -> Option<(String, String)> {
    let namespace = match &dv.spec.base_namespace {
        Some(namespace) => namespace.clone(),
        None => dv.metadata.namespace.clone()?,
    };
    Some((namespace, dv.spec.base_name.clone()))
}

/// Whether the DeploymentVersion derives from the given Deployment.
pub fn references_base(dv: &DeploymentVersion, deployment: &Deployment) -> bool {
    match (
        base_deployment_key(dv),
        &deployment.metadata.namespace,
        &deployment.metadata.name,
    ) {
        (Some((namespace, name)), Some(d_namespace), Some(d_name)) => {
            &namespace == d_namespace && &name == d_name
        }
        _ => false,
    }
}
