// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::controllers::deployment_version_controller::trusted::spec_types::DeploymentSpecOverlay;
use k8s_openapi::api::apps::v1::{DeploymentSpec, DeploymentStrategy};
use k8s_openapi::api::core::v1::{PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("replicas must not be negative, got {0}")]
    NegativeReplicas(i32),
    #[error("selector requires label {key}={value} which the pod template does not carry")]
    SelectorMismatch { key: String, value: String },
    #[error("pod template declares no containers")]
    NoContainers,
}

/// Overlays the partial spec on a copy of the base spec.
///
/// Absent overlay fields leave the base untouched. Maps merge key by key,
/// records recurse, and scalars and sequences set in the overlay replace the
/// base value. The result is not validated; see validate_deployment_spec.
pub fn merge_deployment_spec(base: &DeploymentSpec, overlay: &DeploymentSpecOverlay) -> DeploymentSpec {
    let mut merged = base.clone();
    overlay_value(&mut merged.replicas, &overlay.replicas);
    if let Some(selector) = &overlay.selector {
        merge_label_selector(&mut merged.selector, selector);
    }
    if let Some(template) = &overlay.template {
        merge_pod_template_spec(&mut merged.template, template);
    }
    overlay_value(&mut merged.min_ready_seconds, &overlay.min_ready_seconds);
    if let Some(strategy) = &overlay.strategy {
        merge_deployment_strategy(merged.strategy.get_or_insert_with(Default::default), strategy);
    }
    overlay_value(&mut merged.revision_history_limit, &overlay.revision_history_limit);
    overlay_value(&mut merged.progress_deadline_seconds, &overlay.progress_deadline_seconds);
    overlay_value(&mut merged.paused, &overlay.paused);
    merged
}

pub fn validate_deployment_spec(spec: &DeploymentSpec) -> Result<(), MergeError> {
    if let Some(replicas) = spec.replicas {
        if replicas < 0 {
            return Err(MergeError::NegativeReplicas(replicas));
        }
    }
    let template_labels = spec
        .template
        .metadata
        .as_ref()
        .and_then(|meta| meta.labels.as_ref());
    if let Some(match_labels) = &spec.selector.match_labels {
        for (key, value) in match_labels {
            if template_labels.and_then(|labels| labels.get(key)) != Some(value) {
                return Err(MergeError::SelectorMismatch {
                    key: key.clone(),
                    value: value.clone(),
                });
            }
        }
    }
    match &spec.template.spec {
        Some(pod_spec) if !pod_spec.containers.is_empty() => Ok(()),
        _ => Err(MergeError::NoContainers),
    }
}

/// Checks that every field set in desired holds the same value in current.
///
/// Fields only present in current, such as those populated by server-side
/// defaulting, are ignored. Sequences must have equal length and are
/// compared element-wise with the same rule.
pub fn is_subset(desired: &Value, current: &Value) -> bool {
    match (desired, current) {
        (Value::Object(desired), Value::Object(current)) => desired.iter().all(|(key, value)| {
            match current.get(key) {
                Some(current_value) => is_subset(value, current_value),
                None => value.is_null(),
            }
        }),
        (Value::Array(desired), Value::Array(current)) => {
            desired.len() == current.len()
                && desired.iter().zip(current).all(|(d, c)| is_subset(d, c))
        }
        _ => desired == current,
    }
}

fn overlay_value<T: Clone>(target: &mut Option<T>, overlay: &Option<T>) {
    if let Some(value) = overlay {
        *target = Some(value.clone());
    }
}

fn overlay_map<V: Clone>(target: &mut Option<BTreeMap<String, V>>, overlay: &Option<BTreeMap<String, V>>) {
    if let Some(entries) = overlay {
        let merged = target.get_or_insert_with(BTreeMap::new);
        for (key, value) in entries {
            merged.insert(key.clone(), value.clone());
        }
    }
}

fn merge_label_selector(target: &mut LabelSelector, overlay: &LabelSelector) {
    overlay_map(&mut target.match_labels, &overlay.match_labels);
    overlay_value(&mut target.match_expressions, &overlay.match_expressions);
}

fn merge_deployment_strategy(target: &mut DeploymentStrategy, overlay: &DeploymentStrategy) {
    overlay_value(&mut target.type_, &overlay.type_);
    if let Some(rolling_update) = &overlay.rolling_update {
        let merged = target.rolling_update.get_or_insert_with(Default::default);
        overlay_value(&mut merged.max_surge, &rolling_update.max_surge);
        overlay_value(&mut merged.max_unavailable, &rolling_update.max_unavailable);
    }
}

fn merge_pod_template_spec(target: &mut PodTemplateSpec, overlay: &PodTemplateSpec) {
    if let Some(metadata) = &overlay.metadata {
        merge_template_metadata(target.metadata.get_or_insert_with(Default::default), metadata);
    }
    if let Some(spec) = &overlay.spec {
        merge_pod_spec(target.spec.get_or_insert_with(Default::default), spec);
    }
}

// Server-managed fields have no meaning inside a pod template and are not overlaid.
fn merge_template_metadata(target: &mut ObjectMeta, overlay: &ObjectMeta) {
    overlay_map(&mut target.labels, &overlay.labels);
    overlay_map(&mut target.annotations, &overlay.annotations);
    overlay_value(&mut target.name, &overlay.name);
    overlay_value(&mut target.generate_name, &overlay.generate_name);
    overlay_value(&mut target.namespace, &overlay.namespace);
    overlay_value(&mut target.finalizers, &overlay.finalizers);
}

// Policy records (affinity, security context, DNS config, OS) are atomic: the
// overlay replaces them whole.
fn merge_pod_spec(target: &mut PodSpec, overlay: &PodSpec) {
    // containers is required in the schema, so an overlay that leaves it out
    // deserializes to an empty list.
    if !overlay.containers.is_empty() {
        target.containers = overlay.containers.clone();
    }
    overlay_value(&mut target.active_deadline_seconds, &overlay.active_deadline_seconds);
    overlay_value(&mut target.affinity, &overlay.affinity);
    overlay_value(&mut target.automount_service_account_token, &overlay.automount_service_account_token);
    overlay_value(&mut target.dns_config, &overlay.dns_config);
    overlay_value(&mut target.dns_policy, &overlay.dns_policy);
    overlay_value(&mut target.enable_service_links, &overlay.enable_service_links);
    overlay_value(&mut target.ephemeral_containers, &overlay.ephemeral_containers);
    overlay_value(&mut target.host_aliases, &overlay.host_aliases);
    overlay_value(&mut target.host_ipc, &overlay.host_ipc);
    overlay_value(&mut target.host_network, &overlay.host_network);
    overlay_value(&mut target.host_pid, &overlay.host_pid);
    overlay_value(&mut target.host_users, &overlay.host_users);
    overlay_value(&mut target.hostname, &overlay.hostname);
    overlay_value(&mut target.image_pull_secrets, &overlay.image_pull_secrets);
    overlay_value(&mut target.init_containers, &overlay.init_containers);
    overlay_value(&mut target.node_name, &overlay.node_name);
    overlay_map(&mut target.node_selector, &overlay.node_selector);
    overlay_value(&mut target.os, &overlay.os);
    overlay_map(&mut target.overhead, &overlay.overhead);
    overlay_value(&mut target.preemption_policy, &overlay.preemption_policy);
    overlay_value(&mut target.priority, &overlay.priority);
    overlay_value(&mut target.priority_class_name, &overlay.priority_class_name);
    overlay_value(&mut target.readiness_gates, &overlay.readiness_gates);
    overlay_value(&mut target.resource_claims, &overlay.resource_claims);
    overlay_value(&mut target.restart_policy, &overlay.restart_policy);
    overlay_value(&mut target.runtime_class_name, &overlay.runtime_class_name);
    overlay_value(&mut target.scheduler_name, &overlay.scheduler_name);
    overlay_value(&mut target.scheduling_gates, &overlay.scheduling_gates);
    overlay_value(&mut target.security_context, &overlay.security_context);
    overlay_value(&mut target.service_account, &overlay.service_account);
    overlay_value(&mut target.service_account_name, &overlay.service_account_name);
    overlay_value(&mut target.set_hostname_as_fqdn, &overlay.set_hostname_as_fqdn);
    overlay_value(&mut target.share_process_namespace, &overlay.share_process_namespace);
    overlay_value(&mut target.subdomain, &overlay.subdomain);
    overlay_value(&mut target.termination_grace_period_seconds, &overlay.termination_grace_period_seconds);
    overlay_value(&mut target.tolerations, &overlay.tolerations);
    overlay_value(&mut target.topology_spread_constraints, &overlay.topology_spread_constraints);
    overlay_value(&mut target.volumes, &overlay.volumes);
}
