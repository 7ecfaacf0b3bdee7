// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::controllers::deployment_version_controller::exec::merge::{
    is_subset, merge_deployment_spec, validate_deployment_spec,
};
use crate::controllers::deployment_version_controller::trusted::spec_types::{
    DeploymentVersion, DeploymentVersionCondition, DeploymentVersionStatus,
};
use crate::controllers::deployment_version_controller::trusted::step::DeploymentVersionReconcileStep;
use crate::controllers::deployment_version_controller::trusted::util::{
    base_deployment_key, derived_deployment_name, references_base, FINALIZER,
    LAST_APPLIED_ANNOTATION, READY_CONDITION, VERSION_LABEL,
};
use crate::kubernetes_api_objects::api_method::*;
use crate::kubernetes_api_objects::error::APIError;
use crate::kubernetes_api_objects::object_meta::ObjectMetaExt;
use crate::kubernetes_api_objects::owner_reference::{ensure_owner_reference, is_controlled_by};
use crate::kubernetes_api_objects::resource::ResourceWrapper;
use crate::reconciler::exec::error::ReconcileError;
use crate::reconciler::exec::reconciler::Reconciler;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use kube::runtime::reflector::ObjectRef;
use kube::Resource;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// What to do when the derived Deployment exists but is not controlled by
/// the DeploymentVersion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum AdoptionPolicy {
    /// Leave the object alone and report NotOwned.
    #[default]
    Refuse,
    /// Take control of the object unless another controller owns it.
    Adopt,
}

pub struct DeploymentVersionReconcileState {
    pub reconcile_step: DeploymentVersionReconcileStep,
    pub desired_deployment: Option<Deployment>,
    /// A failure already classified, held while the status reporting it is written.
    pub pending_error: Option<ReconcileError>,
}

#[derive(Debug, Clone, Default)]
pub struct DeploymentVersionReconciler {
    pub adoption_policy: AdoptionPolicy,
}

impl Reconciler for DeploymentVersionReconciler {
    type S = DeploymentVersionReconcileState;
    type K = DeploymentVersion;
    type Owned = Deployment;

    fn reconcile_init_state(&self) -> Self::S {
        reconcile_init_state()
    }

    fn reconcile_core(
        &self,
        dv: &Self::K,
        resp_o: Option<KubeAPIResponse>,
        state: Self::S,
    ) -> (Self::S, Option<KubeAPIRequest>) {
        reconcile_core(dv, resp_o, state, self.adoption_policy)
    }

    fn reconcile_done(&self, state: &Self::S) -> bool {
        reconcile_done(state)
    }

    fn reconcile_error(&self, state: &Self::S) -> Option<ReconcileError> {
        reconcile_error(state)
    }

    fn dependents(
        deployment: &Deployment,
        dvs: &[Arc<DeploymentVersion>],
    ) -> Vec<ObjectRef<DeploymentVersion>> {
        dvs.iter()
            .filter(|dv| references_base(dv, deployment))
            .map(|dv| ObjectRef::from_obj(dv.as_ref()))
            .collect()
    }
}

pub fn reconcile_init_state() -> DeploymentVersionReconcileState {
    DeploymentVersionReconcileState {
        reconcile_step: DeploymentVersionReconcileStep::Init,
        desired_deployment: None,
        pending_error: None,
    }
}

pub fn reconcile_done(state: &DeploymentVersionReconcileState) -> bool {
    matches!(state.reconcile_step, DeploymentVersionReconcileStep::Done)
}

pub fn reconcile_error(state: &DeploymentVersionReconcileState) -> Option<ReconcileError> {
    match &state.reconcile_step {
        DeploymentVersionReconcileStep::Error(error) => Some(error.clone()),
        _ => None,
    }
}

/// The identity of a DeploymentVersion and of the objects derived from it.
struct DeploymentVersionIdentity {
    name: String,
    namespace: String,
    owner_ref: OwnerReference,
}

impl DeploymentVersionIdentity {
    fn of(dv: &DeploymentVersion) -> Result<Self, ReconcileError> {
        let missing = |reason: &str| ReconcileError::MalformedObject {
            key: format!(
                "{}/{}/{}",
                DeploymentVersion::kind(&()),
                dv.metadata.namespace.clone().unwrap_or_default(),
                dv.metadata.name.clone().unwrap_or_default()
            ),
            reason: reason.to_string(),
        };
        let name = dv.metadata.name.clone().ok_or_else(|| missing("missing name"))?;
        let namespace = dv
            .metadata
            .namespace
            .clone()
            .ok_or_else(|| missing("missing namespace"))?;
        let owner_ref = dv
            .controller_owner_ref(&())
            .ok_or_else(|| missing("missing uid"))?;
        Ok(DeploymentVersionIdentity {
            name,
            namespace,
            owner_ref: OwnerReference {
                block_owner_deletion: Some(true),
                ..owner_ref
            },
        })
    }

    fn key(&self) -> KubeObjectRef {
        KubeObjectRef {
            kind: DeploymentVersion::kind(&()).to_string(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    fn derived_name(&self) -> String {
        derived_deployment_name(&self.name)
    }

    fn derived_key(&self) -> KubeObjectRef {
        KubeObjectRef {
            kind: Deployment::kind(&()).to_string(),
            namespace: self.namespace.clone(),
            name: self.derived_name(),
        }
    }
}

pub fn reconcile_core(
    dv: &DeploymentVersion,
    resp_o: Option<KubeAPIResponse>,
    state: DeploymentVersionReconcileState,
    adoption_policy: AdoptionPolicy,
) -> (DeploymentVersionReconcileState, Option<KubeAPIRequest>) {
    let id = match DeploymentVersionIdentity::of(dv) {
        Ok(id) => id,
        Err(error) => return (error_state(state, error), None),
    };
    match state.reconcile_step.clone() {
        DeploymentVersionReconcileStep::Init => {
            if dv.metadata.has_deletion_timestamp() {
                if !dv.metadata.finalizers_contains(FINALIZER) {
                    return (done_state(state), None);
                }
                let req = get_deployment_request(&id.namespace, &id.derived_name());
                return (
                    next_state(state, DeploymentVersionReconcileStep::AfterGetDerivedForCleanup),
                    Some(req),
                );
            }
            if !dv.metadata.finalizers_contains(FINALIZER) {
                let mut dv_with_finalizer = dv.clone();
                dv_with_finalizer.metadata.add_finalizer(FINALIZER);
                return update_dv(
                    state,
                    &id,
                    &dv_with_finalizer,
                    DeploymentVersionReconcileStep::AfterAddFinalizer,
                );
            }
            match base_deployment_key(dv) {
                Some((namespace, name)) => {
                    let req = get_deployment_request(&namespace, &name);
                    (next_state(state, DeploymentVersionReconcileStep::AfterGetBase), Some(req))
                }
                None => (error_state(state, malformed(&id.key(), "missing base namespace")), None),
            }
        }
        DeploymentVersionReconcileStep::AfterAddFinalizer => {
            match resp_o.and_then(KubeAPIResponse::into_update_response) {
                Some(Ok(_)) => (done_state(state), None),
                Some(Err(error)) => {
                    (error_state(state, ReconcileError::from_api_error(&id.key(), error)), None)
                }
                None => (error_state(state, unexpected_response(&id.key())), None),
            }
        }
        DeploymentVersionReconcileStep::AfterGetBase => {
            let base_key = match base_deployment_key(dv) {
                Some((namespace, name)) => KubeObjectRef {
                    kind: Deployment::kind(&()).to_string(),
                    namespace,
                    name,
                },
                None => return (error_state(state, malformed(&id.key(), "missing base namespace")), None),
            };
            match resp_o.and_then(KubeAPIResponse::into_get_response) {
                Some(Ok(obj)) => {
                    let base = match Deployment::unmarshal(obj) {
                        Ok(base) => base,
                        Err(error) => {
                            return (error_state(state, malformed(&base_key, &error.to_string())), None)
                        }
                    };
                    match make_deployment(dv, &id, &base) {
                        Ok(desired) => {
                            let req = get_deployment_request(&id.namespace, &id.derived_name());
                            let state_prime = DeploymentVersionReconcileState {
                                reconcile_step: DeploymentVersionReconcileStep::AfterGetDerived,
                                desired_deployment: Some(desired),
                                ..state
                            };
                            (state_prime, Some(req))
                        }
                        Err(error @ ReconcileError::MergeInvalid(_)) => report_failure(dv, &id, state, error),
                        Err(error) => (error_state(state, error), None),
                    }
                }
                Some(Err(APIError::ObjectNotFound)) => report_failure(
                    dv,
                    &id,
                    state,
                    ReconcileError::RequiredObjectNotFound(base_key.to_string()),
                ),
                Some(Err(error)) => {
                    (error_state(state, ReconcileError::from_api_error(&base_key, error)), None)
                }
                None => (error_state(state, unexpected_response(&base_key)), None),
            }
        }
        DeploymentVersionReconcileStep::AfterGetDerived => {
            let derived_key = id.derived_key();
            let desired = match &state.desired_deployment {
                Some(desired) => desired.clone(),
                None => return (error_state(state, unexpected_response(&derived_key)), None),
            };
            match resp_o.and_then(KubeAPIResponse::into_get_response) {
                Some(Ok(obj)) => {
                    let current = match Deployment::unmarshal(obj) {
                        Ok(current) => current,
                        Err(error) => {
                            return (error_state(state, malformed(&derived_key, &error.to_string())), None)
                        }
                    };
                    if !is_controlled_by(&current.metadata, &id.owner_ref) {
                        let adoptable = adoption_policy == AdoptionPolicy::Adopt
                            && current.metadata.controller_reference().is_none();
                        if !adoptable {
                            warn!("{} exists and is not controlled by {}", derived_key, id.key());
                            return report_failure(
                                dv,
                                &id,
                                state,
                                ReconcileError::NotOwned(derived_key.to_string()),
                            );
                        }
                    }
                    if !same_selector(&desired, &current) {
                        return report_failure(
                            dv,
                            &id,
                            state,
                            ReconcileError::MergeInvalid(format!(
                                "selector of {} is immutable and differs from the merged selector",
                                derived_key
                            )),
                        );
                    }
                    if derived_matches(&desired, &current, &id.owner_ref) {
                        return report_ready(dv, &id, state);
                    }
                    let updated = updated_deployment(&current, &desired, &id.owner_ref);
                    match updated.marshal() {
                        Ok(obj) => {
                            let req = KubeAPIRequest::UpdateRequest(KubeUpdateRequest {
                                api_resource: Deployment::api_resource(),
                                name: id.derived_name(),
                                namespace: id.namespace.clone(),
                                obj,
                            });
                            (
                                next_state(state, DeploymentVersionReconcileStep::AfterUpdateDerived),
                                Some(req),
                            )
                        }
                        Err(error) => {
                            (error_state(state, malformed(&derived_key, &error.to_string())), None)
                        }
                    }
                }
                Some(Err(APIError::ObjectNotFound)) => match desired.marshal() {
                    Ok(obj) => {
                        let req = KubeAPIRequest::CreateRequest(KubeCreateRequest {
                            api_resource: Deployment::api_resource(),
                            namespace: id.namespace.clone(),
                            obj,
                        });
                        (
                            next_state(state, DeploymentVersionReconcileStep::AfterCreateDerived),
                            Some(req),
                        )
                    }
                    Err(error) => (error_state(state, malformed(&derived_key, &error.to_string())), None),
                },
                Some(Err(error)) => {
                    (error_state(state, ReconcileError::from_api_error(&derived_key, error)), None)
                }
                None => (error_state(state, unexpected_response(&derived_key)), None),
            }
        }
        DeploymentVersionReconcileStep::AfterCreateDerived => {
            after_write_derived(dv, &id, state, resp_o.and_then(KubeAPIResponse::into_create_response))
        }
        DeploymentVersionReconcileStep::AfterUpdateDerived => {
            after_write_derived(dv, &id, state, resp_o.and_then(KubeAPIResponse::into_update_response))
        }
        DeploymentVersionReconcileStep::AfterUpdateStatus => {
            let mut state = state;
            let pending_error = state.pending_error.take();
            match resp_o.and_then(KubeAPIResponse::into_update_status_response) {
                // The DeploymentVersion is gone, so there is no status left to report to.
                Some(Ok(_)) | Some(Err(APIError::ObjectNotFound)) => match pending_error {
                    Some(error) => (error_state(state, error), None),
                    None => (done_state(state), None),
                },
                Some(Err(error)) => {
                    let error = pending_error
                        .unwrap_or_else(|| ReconcileError::from_api_error(&id.key(), error));
                    (error_state(state, error), None)
                }
                None => {
                    let error = pending_error.unwrap_or_else(|| unexpected_response(&id.key()));
                    (error_state(state, error), None)
                }
            }
        }
        DeploymentVersionReconcileStep::AfterGetDerivedForCleanup => {
            let derived_key = id.derived_key();
            match resp_o.and_then(KubeAPIResponse::into_get_response) {
                Some(Ok(obj)) => {
                    let current = match Deployment::unmarshal(obj) {
                        Ok(current) => current,
                        Err(error) => {
                            return (error_state(state, malformed(&derived_key, &error.to_string())), None)
                        }
                    };
                    if !is_controlled_by(&current.metadata, &id.owner_ref) {
                        warn!("{} is not controlled by {}, leaving it in place", derived_key, id.key());
                        return remove_finalizer(dv, &id, state);
                    }
                    let req = KubeAPIRequest::DeleteRequest(KubeDeleteRequest {
                        api_resource: Deployment::api_resource(),
                        name: id.derived_name(),
                        namespace: id.namespace.clone(),
                        preconditions: Some(Preconditions {
                            uid: current.metadata.uid.clone(),
                            resource_version: None,
                        }),
                    });
                    (next_state(state, DeploymentVersionReconcileStep::AfterDeleteDerived), Some(req))
                }
                Some(Err(APIError::ObjectNotFound)) => remove_finalizer(dv, &id, state),
                Some(Err(error)) => {
                    (error_state(state, ReconcileError::from_api_error(&derived_key, error)), None)
                }
                None => (error_state(state, unexpected_response(&derived_key)), None),
            }
        }
        DeploymentVersionReconcileStep::AfterDeleteDerived => {
            let derived_key = id.derived_key();
            match resp_o.and_then(KubeAPIResponse::into_delete_response) {
                Some(Ok(())) | Some(Err(APIError::ObjectNotFound)) => remove_finalizer(dv, &id, state),
                Some(Err(error)) => {
                    (error_state(state, ReconcileError::from_api_error(&derived_key, error)), None)
                }
                None => (error_state(state, unexpected_response(&derived_key)), None),
            }
        }
        DeploymentVersionReconcileStep::AfterRemoveFinalizer => {
            match resp_o.and_then(KubeAPIResponse::into_update_response) {
                Some(Ok(_)) | Some(Err(APIError::ObjectNotFound)) => (done_state(state), None),
                Some(Err(error)) => {
                    (error_state(state, ReconcileError::from_api_error(&id.key(), error)), None)
                }
                None => (error_state(state, unexpected_response(&id.key())), None),
            }
        }
        DeploymentVersionReconcileStep::Done | DeploymentVersionReconcileStep::Error(_) => {
            (state, None)
        }
    }
}

/// Builds the derived Deployment from the base and the overlay.
fn make_deployment(
    dv: &DeploymentVersion,
    id: &DeploymentVersionIdentity,
    base: &Deployment,
) -> Result<Deployment, ReconcileError> {
    let base_spec = base.spec.clone().unwrap_or_default();
    let spec = merge_deployment_spec(&base_spec, &dv.spec.overlay);
    validate_deployment_spec(&spec).map_err(|error| ReconcileError::MergeInvalid(error.to_string()))?;
    let last_applied = serde_json::to_string(&spec)
        .map_err(|error| malformed(&id.derived_key(), &error.to_string()))?;

    let mut labels = base.metadata.labels.clone().unwrap_or_default();
    labels.insert(VERSION_LABEL.to_string(), id.name.clone());
    // Revision bookkeeping belongs to the Deployment controller of each object.
    let mut annotations: BTreeMap<String, String> = base
        .metadata
        .annotations
        .iter()
        .flatten()
        .filter(|(key, _)| !key.starts_with("deployment.kubernetes.io/"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    annotations.insert(LAST_APPLIED_ANNOTATION.to_string(), last_applied);

    Ok(Deployment {
        metadata: ObjectMeta {
            name: Some(id.derived_name()),
            namespace: Some(id.namespace.clone()),
            labels: Some(labels),
            annotations: Some(annotations),
            owner_references: Some(vec![id.owner_ref.clone()]),
            ..ObjectMeta::default()
        },
        spec: Some(spec),
        status: None,
    })
}

/// Whether the current derived Deployment already satisfies the desired one.
///
/// Fields the server defaults are absent from the desired spec, so the spec
/// only has to be a subset. Fields dropped from the desired spec are caught
/// by comparing the spec the object was last written with.
fn derived_matches(desired: &Deployment, current: &Deployment, owner_ref: &OwnerReference) -> bool {
    let last_applied = |deployment: &Deployment| {
        deployment
            .metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(LAST_APPLIED_ANNOTATION))
            .cloned()
    };
    let applied_matches = last_applied(desired).is_some() && last_applied(desired) == last_applied(current);
    let spec_matches = match (
        serde_json::to_value(&desired.spec),
        serde_json::to_value(&current.spec),
    ) {
        (Ok(desired_spec), Ok(current_spec)) => is_subset(&desired_spec, &current_spec),
        _ => false,
    };
    let labels_match = desired.metadata.labels.iter().flatten().all(|(key, value)| {
        current
            .metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            == Some(value)
    });
    applied_matches
        && spec_matches
        && labels_match
        && current.metadata.owner_references_contains(owner_ref)
}

/// Whether both Deployments select the same pods. The selector of a
/// Deployment cannot change once it is created.
fn same_selector(desired: &Deployment, current: &Deployment) -> bool {
    let normalized = |deployment: &Deployment| {
        let selector = deployment
            .spec
            .as_ref()
            .map(|spec| spec.selector.clone())
            .unwrap_or_default();
        let LabelSelector {
            match_labels,
            match_expressions,
        } = selector;
        (match_labels.unwrap_or_default(), match_expressions.unwrap_or_default())
    };
    normalized(desired) == normalized(current)
}

/// Carries the desired spec and labels onto the current object, keeping its
/// identity and resource version so a concurrent write fails the update.
fn updated_deployment(
    current: &Deployment,
    desired: &Deployment,
    owner_ref: &OwnerReference,
) -> Deployment {
    let mut updated = current.clone();
    updated.spec = desired.spec.clone();
    if let Some(labels) = &desired.metadata.labels {
        updated
            .metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .extend(labels.clone());
    }
    if let Some(annotations) = &desired.metadata.annotations {
        updated
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .extend(annotations.clone());
    }
    ensure_owner_reference(&mut updated.metadata, owner_ref.clone());
    updated
}

fn after_write_derived(
    dv: &DeploymentVersion,
    id: &DeploymentVersionIdentity,
    state: DeploymentVersionReconcileState,
    res: Option<Result<kube::api::DynamicObject, APIError>>,
) -> (DeploymentVersionReconcileState, Option<KubeAPIRequest>) {
    match res {
        Some(Ok(_)) => report_ready(dv, id, state),
        Some(Err(APIError::Invalid)) => report_failure(
            dv,
            id,
            state,
            ReconcileError::MergeInvalid(format!("{} rejected the merged object", id.derived_key())),
        ),
        Some(Err(error)) => (
            error_state(state, ReconcileError::from_api_error(&id.derived_key(), error)),
            None,
        ),
        None => (error_state(state, unexpected_response(&id.derived_key())), None),
    }
}

fn report_ready(
    dv: &DeploymentVersion,
    id: &DeploymentVersionIdentity,
    state: DeploymentVersionReconcileState,
) -> (DeploymentVersionReconcileState, Option<KubeAPIRequest>) {
    let status = DeploymentVersionStatus {
        observed_generation: dv.metadata.generation,
        derived_deployment: Some(id.derived_name()),
        conditions: vec![DeploymentVersionCondition {
            type_: READY_CONDITION.to_string(),
            status: "True".to_string(),
            reason: Some("Reconciled".to_string()),
            message: Some(format!("{} is up to date", id.derived_key())),
        }],
    };
    update_status(dv, id, state, status, None)
}

/// Ends the reconcile with the error, reporting it in the status first.
fn report_failure(
    dv: &DeploymentVersion,
    id: &DeploymentVersionIdentity,
    state: DeploymentVersionReconcileState,
    error: ReconcileError,
) -> (DeploymentVersionReconcileState, Option<KubeAPIRequest>) {
    let status = DeploymentVersionStatus {
        observed_generation: dv.metadata.generation,
        derived_deployment: dv.status.as_ref().and_then(|s| s.derived_deployment.clone()),
        conditions: vec![DeploymentVersionCondition {
            type_: READY_CONDITION.to_string(),
            status: "False".to_string(),
            reason: Some(error.reason().to_string()),
            message: Some(error.to_string()),
        }],
    };
    update_status(dv, id, state, status, Some(error))
}

/// Writes the status unless the stored one is already equal.
fn update_status(
    dv: &DeploymentVersion,
    id: &DeploymentVersionIdentity,
    state: DeploymentVersionReconcileState,
    status: DeploymentVersionStatus,
    pending_error: Option<ReconcileError>,
) -> (DeploymentVersionReconcileState, Option<KubeAPIRequest>) {
    if dv.status.as_ref() == Some(&status) {
        return match pending_error {
            Some(error) => (error_state(state, error), None),
            None => (done_state(state), None),
        };
    }
    let mut dv_with_status = dv.clone();
    dv_with_status.status = Some(status);
    match dv_with_status.marshal() {
        Ok(obj) => {
            let req = KubeAPIRequest::UpdateStatusRequest(KubeUpdateStatusRequest {
                api_resource: DeploymentVersion::api_resource(),
                name: id.name.clone(),
                namespace: id.namespace.clone(),
                obj,
            });
            let state_prime = DeploymentVersionReconcileState {
                reconcile_step: DeploymentVersionReconcileStep::AfterUpdateStatus,
                pending_error,
                ..state
            };
            (state_prime, Some(req))
        }
        Err(error) => (error_state(state, malformed(&id.key(), &error.to_string())), None),
    }
}

fn remove_finalizer(
    dv: &DeploymentVersion,
    id: &DeploymentVersionIdentity,
    state: DeploymentVersionReconcileState,
) -> (DeploymentVersionReconcileState, Option<KubeAPIRequest>) {
    let mut dv_without_finalizer = dv.clone();
    dv_without_finalizer.metadata.remove_finalizer(FINALIZER);
    update_dv(
        state,
        id,
        &dv_without_finalizer,
        DeploymentVersionReconcileStep::AfterRemoveFinalizer,
    )
}

fn update_dv(
    state: DeploymentVersionReconcileState,
    id: &DeploymentVersionIdentity,
    dv: &DeploymentVersion,
    next_step: DeploymentVersionReconcileStep,
) -> (DeploymentVersionReconcileState, Option<KubeAPIRequest>) {
    match dv.marshal() {
        Ok(obj) => {
            let req = KubeAPIRequest::UpdateRequest(KubeUpdateRequest {
                api_resource: DeploymentVersion::api_resource(),
                name: id.name.clone(),
                namespace: id.namespace.clone(),
                obj,
            });
            (next_state(state, next_step), Some(req))
        }
        Err(error) => (error_state(state, malformed(&id.key(), &error.to_string())), None),
    }
}

fn get_deployment_request(namespace: &str, name: &str) -> KubeAPIRequest {
    KubeAPIRequest::GetRequest(KubeGetRequest {
        api_resource: Deployment::api_resource(),
        name: name.to_string(),
        namespace: namespace.to_string(),
    })
}

fn malformed(key: &KubeObjectRef, reason: &str) -> ReconcileError {
    ReconcileError::MalformedObject {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn unexpected_response(key: &KubeObjectRef) -> ReconcileError {
    ReconcileError::StoreUnavailable {
        key: key.to_string(),
        error: APIError::Other,
    }
}

fn next_state(
    state: DeploymentVersionReconcileState,
    reconcile_step: DeploymentVersionReconcileStep,
) -> DeploymentVersionReconcileState {
    DeploymentVersionReconcileState {
        reconcile_step,
        ..state
    }
}

fn done_state(state: DeploymentVersionReconcileState) -> DeploymentVersionReconcileState {
    next_state(state, DeploymentVersionReconcileStep::Done)
}

fn error_state(
    state: DeploymentVersionReconcileState,
    error: ReconcileError,
) -> DeploymentVersionReconcileState {
    next_state(state, DeploymentVersionReconcileStep::Error(error))
}
