// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::executable_model::api_server_state::{ApiServerCall, ApiServerState, ApiVerb};
use crate::kubernetes_api_objects::api_method::*;
use crate::kubernetes_api_objects::error::APIError;
use crate::kubernetes_api_objects::object_meta::ObjectMetaExt;
use crate::kubernetes_api_objects::owner_reference::filter_controller_references;
use crate::kubernetes_api_objects::resource::ResourceWrapper;
use crate::shim_layer::store::Store;
use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::{ApiResource, DynamicObject};
use kube::core::TypeMeta;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

// The ExecutableApiServer is an in-memory model of the Kubernetes API server.
// It implements the semantics the reconcilers depend on: resource version and
// uid assignment, optimistic concurrency on updates, finalizer-gated deletion,
// the status subresource and delete preconditions. It records every write so
// tests can check which requests a reconcile issued.
pub struct ExecutableApiServer {
    state: Mutex<ApiServerState>,
}

impl Default for ExecutableApiServer {
    fn default() -> Self {
        ExecutableApiServer::new()
    }
}

impl ExecutableApiServer {
    pub fn new() -> Self {
        ExecutableApiServer {
            state: Mutex::new(ApiServerState::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ApiServerState> {
        // No handler panics while holding the lock, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Creates the object on behalf of a user. The write is not recorded.
    pub fn seed<K: ResourceWrapper>(&self, obj: &K) -> Result<K, APIError> {
        let obj = obj.marshal().map_err(|_| APIError::BadRequest)?;
        let req = KubeCreateRequest {
            api_resource: K::api_resource(),
            namespace: obj.metadata.namespace.clone().unwrap_or_default(),
            obj,
        };
        let created = handle_create_request(&req, &mut self.state()).res?;
        K::unmarshal(created).map_err(|_| APIError::BadRequest)
    }

    /// Replaces the object on behalf of a user. The write is not recorded.
    pub fn replace<K: ResourceWrapper>(&self, obj: &K) -> Result<K, APIError> {
        let obj = obj.marshal().map_err(|_| APIError::BadRequest)?;
        let req = KubeUpdateRequest {
            api_resource: K::api_resource(),
            name: obj.metadata.name.clone().unwrap_or_default(),
            namespace: obj.metadata.namespace.clone().unwrap_or_default(),
            obj,
        };
        let updated = handle_update_request(&req, &mut self.state()).res?;
        K::unmarshal(updated).map_err(|_| APIError::BadRequest)
    }

    /// Deletes the object on behalf of a user. The write is not recorded.
    pub fn remove<K: ResourceWrapper>(&self, namespace: &str, name: &str) -> Result<(), APIError> {
        let req = KubeDeleteRequest {
            api_resource: K::api_resource(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            preconditions: None,
        };
        handle_delete_request(&req, &mut self.state()).res
    }

    pub fn lookup<K: ResourceWrapper>(&self, namespace: &str, name: &str) -> Option<K> {
        let req = KubeGetRequest {
            api_resource: K::api_resource(),
            name: name.to_string(),
            namespace: namespace.to_string(),
        };
        let obj = handle_get_request(&req, &self.state()).res.ok()?;
        K::unmarshal(obj).ok()
    }

    /// Writes received through the Store interface, oldest first.
    pub fn history(&self) -> Vec<ApiServerCall> {
        self.state().history.clone()
    }

    pub fn clear_history(&self) {
        self.state().history.clear();
    }

    /// Successful writes of the verb on objects of the kind.
    pub fn count_writes(&self, verb: ApiVerb, kind: &str) -> usize {
        self.state()
            .history
            .iter()
            .filter(|call| call.verb == verb && call.key.kind == kind && call.res.is_ok())
            .count()
    }

    pub fn resource_version_counter(&self) -> i64 {
        self.state().resource_version_counter
    }

    fn record(&self, verb: ApiVerb, key: KubeObjectRef, res: Result<(), APIError>) {
        self.state().history.push(ApiServerCall { verb, key, res });
    }
}

impl Store for ExecutableApiServer {
    async fn get(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, APIError> {
        let req = KubeGetRequest {
            api_resource: api_resource.clone(),
            name: name.to_string(),
            namespace: namespace.to_string(),
        };
        handle_get_request(&req, &self.state()).res
    }

    async fn create(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, APIError> {
        let req = KubeCreateRequest {
            api_resource: api_resource.clone(),
            namespace: namespace.to_string(),
            obj: obj.clone(),
        };
        let res = handle_create_request(&req, &mut self.state()).res;
        self.record(ApiVerb::Create, req.key(), res.as_ref().map(|_| ()).map_err(|e| *e));
        res
    }

    async fn update(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, APIError> {
        let req = KubeUpdateRequest {
            api_resource: api_resource.clone(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            obj: obj.clone(),
        };
        let res = handle_update_request(&req, &mut self.state()).res;
        self.record(ApiVerb::Update, req.key(), res.as_ref().map(|_| ()).map_err(|e| *e));
        res
    }

    async fn update_status(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, APIError> {
        let req = KubeUpdateStatusRequest {
            api_resource: api_resource.clone(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            obj: obj.clone(),
        };
        let res = handle_update_status_request(&req, &mut self.state()).res;
        self.record(ApiVerb::UpdateStatus, req.key(), res.as_ref().map(|_| ()).map_err(|e| *e));
        res
    }

    async fn delete(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
        preconditions: Option<&Preconditions>,
    ) -> Result<(), APIError> {
        let req = KubeDeleteRequest {
            api_resource: api_resource.clone(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            preconditions: preconditions.cloned(),
        };
        let res = handle_delete_request(&req, &mut self.state()).res;
        self.record(ApiVerb::Delete, req.key(), res);
        res
    }
}

// Custom resources reject updates that carry no resource version.
fn allow_unconditional_update(api_resource: &ApiResource) -> bool {
    api_resource.group.is_empty()
        || !api_resource.group.contains('.')
        || api_resource.group.ends_with(".k8s.io")
}

fn same_object(obj: &DynamicObject, other: &DynamicObject) -> bool {
    obj.types == other.types && obj.metadata == other.metadata && obj.data == other.data
}

fn spec_part(obj: &DynamicObject) -> serde_json::Value {
    let mut data = obj.data.clone();
    if let Some(fields) = data.as_object_mut() {
        fields.remove("status");
    }
    data
}

fn set_status_from(obj: &mut DynamicObject, old_obj: &DynamicObject) {
    let status = old_obj.data.get("status").cloned();
    if let Some(fields) = obj.data.as_object_mut() {
        match status {
            Some(status) => {
                fields.insert("status".to_string(), status);
            }
            None => {
                fields.remove("status");
            }
        }
    }
}

fn metadata_validity_check(obj: &DynamicObject) -> Option<APIError> {
    let owner_refs = obj.metadata.owner_references.as_deref().unwrap_or_default();
    if filter_controller_references(owner_refs).len() > 1 {
        Some(APIError::Invalid)
    } else {
        None
    }
}

// The pod selector of a workload is fixed at creation.
fn immutable_fields_check(
    api_resource: &ApiResource,
    obj: &DynamicObject,
    old_obj: &DynamicObject,
) -> Option<APIError> {
    let immutable = api_resource.group == "apps"
        && matches!(api_resource.kind.as_str(), "Deployment" | "StatefulSet" | "DaemonSet" | "ReplicaSet");
    if immutable && obj.data.pointer("/spec/selector") != old_obj.data.pointer("/spec/selector") {
        Some(APIError::Invalid)
    } else {
        None
    }
}

// A terminating object can lose finalizers but never gain new ones.
fn metadata_transition_validity_check(obj: &DynamicObject, old_obj: &DynamicObject) -> Option<APIError> {
    if !old_obj.metadata.has_deletion_timestamp() {
        return None;
    }
    let old_finalizers: BTreeSet<&String> = old_obj.metadata.finalizers.iter().flatten().collect();
    if obj
        .metadata
        .finalizers
        .iter()
        .flatten()
        .all(|f| old_finalizers.contains(f))
    {
        None
    } else {
        Some(APIError::Forbidden)
    }
}

pub fn handle_get_request(req: &KubeGetRequest, s: &ApiServerState) -> KubeGetResponse {
    match s.resources.get(&req.key()) {
        Some(obj) => KubeGetResponse { res: Ok(obj.clone()) },
        None => KubeGetResponse {
            res: Err(APIError::ObjectNotFound),
        },
    }
}

fn create_request_admission_check(req: &KubeCreateRequest, s: &ApiServerState) -> Option<APIError> {
    if req.obj.metadata.name.is_none() {
        Some(APIError::Invalid)
    } else if req
        .obj
        .metadata
        .namespace
        .as_ref()
        .map_or(false, |namespace| namespace != &req.namespace)
    {
        Some(APIError::BadRequest)
    } else if req
        .obj
        .types
        .as_ref()
        .map_or(false, |types| types.kind != req.api_resource.kind)
    {
        Some(APIError::BadRequest)
    } else if s.resources.contains_key(&req.key()) {
        Some(APIError::ObjectAlreadyExists)
    } else {
        None
    }
}

pub fn handle_create_request(req: &KubeCreateRequest, s: &mut ApiServerState) -> KubeCreateResponse {
    if let Some(err) = create_request_admission_check(req, s) {
        return KubeCreateResponse { res: Err(err) };
    }
    let mut created_obj = req.obj.clone();
    created_obj.types = Some(TypeMeta {
        api_version: req.api_resource.api_version.clone(),
        kind: req.api_resource.kind.clone(),
    });
    created_obj.metadata.namespace = Some(req.namespace.clone());
    created_obj.metadata.resource_version = Some(s.resource_version_counter.to_string());
    created_obj.metadata.uid = Some(s.uid_counter.to_string());
    created_obj.metadata.generation = Some(1);
    created_obj.metadata.creation_timestamp = Some(Time(Utc::now()));
    created_obj.metadata.deletion_timestamp = None;
    if let Some(err) = metadata_validity_check(&created_obj) {
        return KubeCreateResponse { res: Err(err) };
    }
    s.resources.insert(req.key(), created_obj.clone());
    s.uid_counter += 1;
    s.resource_version_counter += 1;
    KubeCreateResponse {
        res: Ok(created_obj),
    }
}

pub fn handle_delete_request(req: &KubeDeleteRequest, s: &mut ApiServerState) -> KubeDeleteResponse {
    let req_key = req.key();
    let mut obj = match s.resources.get(&req_key) {
        Some(obj) => obj.clone(),
        None => {
            return KubeDeleteResponse {
                res: Err(APIError::ObjectNotFound),
            }
        }
    };
    if let Some(preconditions) = &req.preconditions {
        let uid_mismatch = preconditions
            .uid
            .as_ref()
            .map_or(false, |uid| obj.metadata.uid.as_ref() != Some(uid));
        let rv_mismatch = preconditions
            .resource_version
            .as_ref()
            .map_or(false, |rv| obj.metadata.resource_version.as_ref() != Some(rv));
        if uid_mismatch || rv_mismatch {
            return KubeDeleteResponse {
                res: Err(APIError::Conflict),
            };
        }
    }
    if obj.metadata.has_finalizers() {
        if !obj.metadata.has_deletion_timestamp() {
            obj.metadata.deletion_timestamp = Some(Time(Utc::now()));
            obj.metadata.resource_version = Some(s.resource_version_counter.to_string());
            s.resources.insert(req_key, obj);
            s.resource_version_counter += 1;
        }
    } else {
        s.resources.remove(&req_key);
        s.resource_version_counter += 1;
    }
    KubeDeleteResponse { res: Ok(()) }
}

fn update_request_admission_check_helper(
    api_resource: &ApiResource,
    name: &str,
    namespace: &str,
    obj: &DynamicObject,
    s: &ApiServerState,
) -> Option<APIError> {
    let key = KubeObjectRef {
        kind: api_resource.kind.clone(),
        namespace: namespace.to_string(),
        name: name.to_string(),
    };
    match &obj.metadata.name {
        None => return Some(APIError::BadRequest),
        Some(obj_name) if obj_name != name => return Some(APIError::BadRequest),
        _ => {}
    }
    if obj
        .metadata
        .namespace
        .as_ref()
        .map_or(false, |obj_namespace| obj_namespace != namespace)
    {
        return Some(APIError::BadRequest);
    }
    let old_obj = match s.resources.get(&key) {
        Some(old_obj) => old_obj,
        None => return Some(APIError::ObjectNotFound),
    };
    if obj.metadata.resource_version.is_none() && !allow_unconditional_update(api_resource) {
        Some(APIError::Invalid)
    } else if obj.metadata.resource_version.is_some()
        && !obj.metadata.resource_version_eq(&old_obj.metadata)
    {
        Some(APIError::Conflict)
    } else if obj.metadata.uid.is_some() && !obj.metadata.uid_eq(&old_obj.metadata) {
        Some(APIError::InternalError)
    } else {
        None
    }
}

fn updated_object(req: &KubeUpdateRequest, old_obj: &DynamicObject) -> DynamicObject {
    let mut updated_obj = req.obj.clone();
    updated_obj.types = old_obj.types.clone();
    updated_obj.metadata.namespace = Some(req.namespace.clone());
    updated_obj.metadata.resource_version = old_obj.metadata.resource_version.clone();
    updated_obj.metadata.uid = old_obj.metadata.uid.clone();
    updated_obj.metadata.generation = old_obj.metadata.generation;
    updated_obj.metadata.creation_timestamp = old_obj.metadata.creation_timestamp.clone();
    updated_obj.metadata.deletion_timestamp = old_obj.metadata.deletion_timestamp.clone();
    set_status_from(&mut updated_obj, old_obj);
    updated_obj
}

pub fn handle_update_request(req: &KubeUpdateRequest, s: &mut ApiServerState) -> KubeUpdateResponse {
    if let Some(err) =
        update_request_admission_check_helper(&req.api_resource, &req.name, &req.namespace, &req.obj, s)
    {
        return KubeUpdateResponse { res: Err(err) };
    }
    let req_key = req.key();
    let old_obj = match s.resources.get(&req_key) {
        Some(old_obj) => old_obj.clone(),
        None => {
            return KubeUpdateResponse {
                res: Err(APIError::ObjectNotFound),
            }
        }
    };
    let mut updated_obj = updated_object(req, &old_obj);
    if same_object(&updated_obj, &old_obj) {
        return KubeUpdateResponse { res: Ok(old_obj) };
    }
    updated_obj.metadata.resource_version = Some(s.resource_version_counter.to_string());
    if spec_part(&updated_obj) != spec_part(&old_obj) {
        updated_obj.metadata.generation = Some(old_obj.metadata.generation.unwrap_or(0) + 1);
    }
    if let Some(err) = metadata_validity_check(&updated_obj)
        .or_else(|| metadata_transition_validity_check(&updated_obj, &old_obj))
        .or_else(|| immutable_fields_check(&req.api_resource, &updated_obj, &old_obj))
    {
        return KubeUpdateResponse { res: Err(err) };
    }
    // A terminating object is removed once its last finalizer is gone.
    if updated_obj.metadata.has_deletion_timestamp() && !updated_obj.metadata.has_finalizers() {
        s.resources.remove(&req_key);
    } else {
        s.resources.insert(req_key, updated_obj.clone());
    }
    s.resource_version_counter += 1;
    KubeUpdateResponse {
        res: Ok(updated_obj),
    }
}

fn status_updated_object(req: &KubeUpdateStatusRequest, old_obj: &DynamicObject) -> DynamicObject {
    let mut status_updated_obj = old_obj.clone();
    set_status_from(&mut status_updated_obj, &req.obj);
    status_updated_obj
}

pub fn handle_update_status_request(
    req: &KubeUpdateStatusRequest,
    s: &mut ApiServerState,
) -> KubeUpdateStatusResponse {
    if let Some(err) =
        update_request_admission_check_helper(&req.api_resource, &req.name, &req.namespace, &req.obj, s)
    {
        return KubeUpdateStatusResponse { res: Err(err) };
    }
    let req_key = req.key();
    let old_obj = match s.resources.get(&req_key) {
        Some(old_obj) => old_obj.clone(),
        None => {
            return KubeUpdateStatusResponse {
                res: Err(APIError::ObjectNotFound),
            }
        }
    };
    let mut status_updated_obj = status_updated_object(req, &old_obj);
    if same_object(&status_updated_obj, &old_obj) {
        return KubeUpdateStatusResponse { res: Ok(old_obj) };
    }
    status_updated_obj.metadata.resource_version = Some(s.resource_version_counter.to_string());
    s.resources.insert(req_key, status_updated_obj.clone());
    s.resource_version_counter += 1;
    KubeUpdateStatusResponse {
        res: Ok(status_updated_obj),
    }
}
