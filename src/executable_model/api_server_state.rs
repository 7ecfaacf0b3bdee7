// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::executable_model::object_map::ObjectMap;
use crate::kubernetes_api_objects::api_method::KubeObjectRef;
use crate::kubernetes_api_objects::error::APIError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVerb {
    Create,
    Update,
    UpdateStatus,
    Delete,
}

/// One write received by the API server model, whether or not it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiServerCall {
    pub verb: ApiVerb,
    pub key: KubeObjectRef,
    pub res: Result<(), APIError>,
}

// The state of the API server model.
#[derive(Debug, Clone)]
pub struct ApiServerState {
    pub resources: ObjectMap,
    pub uid_counter: i64,
    pub resource_version_counter: i64,
    pub history: Vec<ApiServerCall>,
}

impl ApiServerState {
    pub fn new() -> ApiServerState {
        ApiServerState {
            resources: ObjectMap::new(),
            uid_counter: 0,
            resource_version_counter: 0,
            history: Vec::new(),
        }
    }
}

impl Default for ApiServerState {
    fn default() -> Self {
        ApiServerState::new()
    }
}
