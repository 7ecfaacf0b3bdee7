// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::error::APIError;
use kube::api::{ApiResource, DynamicObject};
use std::fmt;

/// KubeObjectRef identifies one object in the store by its kind, namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KubeObjectRef {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for KubeObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

// KubeAPIRequest represents API requests issued by reconcile_core.
//
// kube-rs uses a generic type kube::api::Api as an api handle to send
// requests to the Kubernetes API.
// So each request wraps around the variables used to instantiate
// kube::api::Api<DynamicObject> (the ApiResource and the namespace)
// and the arguments of the method called on it.
#[derive(Debug, Clone)]
pub enum KubeAPIRequest {
    GetRequest(KubeGetRequest),
    CreateRequest(KubeCreateRequest),
    DeleteRequest(KubeDeleteRequest),
    UpdateRequest(KubeUpdateRequest),
    UpdateStatusRequest(KubeUpdateStatusRequest),
}

impl KubeAPIRequest {
    pub fn key(&self) -> KubeObjectRef {
        match self {
            KubeAPIRequest::GetRequest(req) => req.key(),
            KubeAPIRequest::CreateRequest(req) => req.key(),
            KubeAPIRequest::DeleteRequest(req) => req.key(),
            KubeAPIRequest::UpdateRequest(req) => req.key(),
            KubeAPIRequest::UpdateStatusRequest(req) => req.key(),
        }
    }

    /// Whether the request writes to the store.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, KubeAPIRequest::GetRequest(_))
    }
}

// KubeGetRequest has the name as the parameter of Api.get(), and namespace to instantiate an Api.
#[derive(Debug, Clone)]
pub struct KubeGetRequest {
    pub api_resource: ApiResource,
    pub name: String,
    pub namespace: String,
}

impl KubeGetRequest {
    pub fn key(&self) -> KubeObjectRef {
        KubeObjectRef {
            kind: self.api_resource.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

// KubeCreateRequest has the obj as the parameter of Api.create().
#[derive(Debug, Clone)]
pub struct KubeCreateRequest {
    pub api_resource: ApiResource,
    pub namespace: String,
    pub obj: DynamicObject,
}

impl KubeCreateRequest {
    pub fn key(&self) -> KubeObjectRef {
        KubeObjectRef {
            kind: self.api_resource.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.obj.metadata.name.clone().unwrap_or_default(),
        }
    }
}

/// Preconditions checked by the store before a delete is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preconditions {
    pub uid: Option<String>,
    pub resource_version: Option<String>,
}

// KubeDeleteRequest has the name as the parameter of Api.delete(), and namespace to instantiate an Api.
#[derive(Debug, Clone)]
pub struct KubeDeleteRequest {
    pub api_resource: ApiResource,
    pub name: String,
    pub namespace: String,
    pub preconditions: Option<Preconditions>,
}

impl KubeDeleteRequest {
    pub fn key(&self) -> KubeObjectRef {
        KubeObjectRef {
            kind: self.api_resource.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

// KubeUpdateRequest has the obj as the parameter of Api.replace().
// The obj carries the resource version read in the same reconcile,
// which the store uses to reject conflicting writes.
#[derive(Debug, Clone)]
pub struct KubeUpdateRequest {
    pub api_resource: ApiResource,
    pub name: String,
    pub namespace: String,
    pub obj: DynamicObject,
}

impl KubeUpdateRequest {
    pub fn key(&self) -> KubeObjectRef {
        KubeObjectRef {
            kind: self.api_resource.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

// KubeUpdateStatusRequest has the obj as the parameter of Api.replace_status().
#[derive(Debug, Clone)]
pub struct KubeUpdateStatusRequest {
    pub api_resource: ApiResource,
    pub name: String,
    pub namespace: String,
    pub obj: DynamicObject,
}

impl KubeUpdateStatusRequest {
    pub fn key(&self) -> KubeObjectRef {
        KubeObjectRef {
            kind: self.api_resource.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

// KubeAPIResponse represents API results used in reconcile_core.
#[derive(Debug, Clone)]
pub enum KubeAPIResponse {
    GetResponse(KubeGetResponse),
    CreateResponse(KubeCreateResponse),
    DeleteResponse(KubeDeleteResponse),
    UpdateResponse(KubeUpdateResponse),
    UpdateStatusResponse(KubeUpdateStatusResponse),
}

#[derive(Debug, Clone)]
pub struct KubeGetResponse {
    pub res: Result<DynamicObject, APIError>,
}

#[derive(Debug, Clone)]
pub struct KubeCreateResponse {
    pub res: Result<DynamicObject, APIError>,
}

#[derive(Debug, Clone)]
pub struct KubeDeleteResponse {
    pub res: Result<(), APIError>,
}

#[derive(Debug, Clone)]
pub struct KubeUpdateResponse {
    pub res: Result<DynamicObject, APIError>,
}

#[derive(Debug, Clone)]
pub struct KubeUpdateStatusResponse {
    pub res: Result<DynamicObject, APIError>,
}

impl KubeAPIResponse {
    pub fn into_get_response(self) -> Option<Result<DynamicObject, APIError>> {
        match self {
            KubeAPIResponse::GetResponse(resp) => Some(resp.res),
            _ => None,
        }
    }

    pub fn into_create_response(self) -> Option<Result<DynamicObject, APIError>> {
        match self {
            KubeAPIResponse::CreateResponse(resp) => Some(resp.res),
            _ => None,
        }
    }

    pub fn into_delete_response(self) -> Option<Result<(), APIError>> {
        match self {
            KubeAPIResponse::DeleteResponse(resp) => Some(resp.res),
            _ => None,
        }
    }

    pub fn into_update_response(self) -> Option<Result<DynamicObject, APIError>> {
        match self {
            KubeAPIResponse::UpdateResponse(resp) => Some(resp.res),
            _ => None,
        }
    }

    pub fn into_update_status_response(self) -> Option<Result<DynamicObject, APIError>> {
        match self {
            KubeAPIResponse::UpdateStatusResponse(resp) => Some(resp.res),
            _ => None,
        }
    }
}
