// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::controllers::deployment_version_controller::trusted::util::READY_CONDITION;
use k8s_openapi::api::apps::v1::DeploymentStrategy;
use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

/// DeploymentVersion declares a derived Deployment: the base Deployment's spec
/// with the overlay merged on top.
#[derive(
    kube::CustomResource,
    Default,
    Debug,
    Clone,
    serde::Deserialize,
    serde::Serialize,
    schemars::JsonSchema,
    PartialEq,
)]
#[kube(group = "anvil.dev", version = "v1", kind = "DeploymentVersion")]
#[kube(shortname = "dv", namespaced)]
#[kube(status = "DeploymentVersionStatus")]
pub struct DeploymentVersionSpec {
    /// Defaults to the namespace of the DeploymentVersion.
    #[serde(rename = "baseNamespace", default, skip_serializing_if = "Option::is_none")]
    pub base_namespace: Option<String>,
    #[serde(rename = "baseName")]
    pub base_name: String,
    #[serde(default)]
    pub overlay: DeploymentSpecOverlay,
}

impl Default for DeploymentVersion {
    fn default() -> Self {
        Self {
            metadata: ObjectMeta::default(),
            spec: DeploymentVersionSpec::default(),
            status: None,
        }
    }
}

/// A partial DeploymentSpec. Every field is optional and an absent field
/// leaves the base value untouched.
#[derive(Default, Debug, Clone, serde::Deserialize, serde::Serialize, schemars::JsonSchema, PartialEq)]
pub struct DeploymentSpecOverlay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<PodTemplateSpec>,
    #[serde(rename = "minReadySeconds", skip_serializing_if = "Option::is_none")]
    pub min_ready_seconds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<DeploymentStrategy>,
    #[serde(rename = "revisionHistoryLimit", skip_serializing_if = "Option::is_none")]
    pub revision_history_limit: Option<i32>,
    #[serde(rename = "progressDeadlineSeconds", skip_serializing_if = "Option::is_none")]
    pub progress_deadline_seconds: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
}

#[derive(Default, Debug, Clone, serde::Deserialize, serde::Serialize, schemars::JsonSchema, PartialEq)]
pub struct DeploymentVersionStatus {
    #[serde(rename = "observedGeneration", skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(rename = "derivedDeployment", skip_serializing_if = "Option::is_none")]
    pub derived_deployment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<DeploymentVersionCondition>,
}

#[derive(Default, Debug, Clone, serde::Deserialize, serde::Serialize, schemars::JsonSchema, PartialEq)]
pub struct DeploymentVersionCondition {
    #[serde(rename = "type")]
    pub type_: String,
    /// "True" or "False".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeploymentVersionStatus {
    pub fn ready_condition(&self) -> Option<&DeploymentVersionCondition> {
        self.conditions.iter().find(|c| c.type_ == READY_CONDITION)
    }
}
