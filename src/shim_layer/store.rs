// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::api_method::Preconditions;
use crate::kubernetes_api_objects::error::APIError;
use futures::Future;
use kube::api::{Api, ApiResource, DeleteParams, DynamicObject, PostParams};
use kube::Client;

/// Store is the object store the shim layer sends reconcile_core's requests to.
///
/// Objects are addressed by their ApiResource, namespace and name. Reads are
/// quorum reads and writes are checked against the resource version carried
/// by the object, so a stale write fails with APIError::Conflict.
pub trait Store: Send + Sync {
    fn get(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<DynamicObject, APIError>> + Send;

    fn create(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        obj: &DynamicObject,
    ) -> impl Future<Output = Result<DynamicObject, APIError>> + Send;

    fn update(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
        obj: &DynamicObject,
    ) -> impl Future<Output = Result<DynamicObject, APIError>> + Send;

    /// Writes only the status of the object; metadata and spec are kept.
    fn update_status(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
        obj: &DynamicObject,
    ) -> impl Future<Output = Result<DynamicObject, APIError>> + Send;

    fn delete(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
        preconditions: Option<&Preconditions>,
    ) -> impl Future<Output = Result<(), APIError>> + Send;
}

/// KubeClientStore serves requests from a Kubernetes API server through kube-rs.
#[derive(Clone)]
pub struct KubeClientStore {
    client: Client,
}

impl KubeClientStore {
    pub fn new(client: Client) -> Self {
        KubeClientStore { client }
    }

    fn api(&self, api_resource: &ApiResource, namespace: &str) -> Api<DynamicObject> {
        Api::<DynamicObject>::namespaced_with(self.client.clone(), namespace, api_resource)
    }
}

impl Store for KubeClientStore {
    async fn get(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, APIError> {
        self.api(api_resource, namespace)
            .get(name)
            .await
            .map_err(|err| APIError::from(&err))
    }

    async fn create(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, APIError> {
        self.api(api_resource, namespace)
            .create(&PostParams::default(), obj)
            .await
            .map_err(|err| APIError::from(&err))
    }

    async fn update(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, APIError> {
        self.api(api_resource, namespace)
            .replace(name, &PostParams::default(), obj)
            .await
            .map_err(|err| APIError::from(&err))
    }

    async fn update_status(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
        obj: &DynamicObject,
    ) -> Result<DynamicObject, APIError> {
        let data = serde_json::to_vec(obj).map_err(|_| APIError::BadRequest)?;
        self.api(api_resource, namespace)
            .replace_status(name, &PostParams::default(), data)
            .await
            .map_err(|err| APIError::from(&err))
    }

    async fn delete(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
        preconditions: Option<&Preconditions>,
    ) -> Result<(), APIError> {
        let dp = DeleteParams {
            preconditions: preconditions.map(|p| kube::api::Preconditions {
                uid: p.uid.clone(),
                resource_version: p.resource_version.clone(),
            }),
            ..DeleteParams::default()
        };
        self.api(api_resource, namespace)
            .delete(name, &dp)
            .await
            .map(|_| ())
            .map_err(|err| APIError::from(&err))
    }
}
