// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::error::ParseDynamicObjectError;
use kube::api::{ApiResource, DynamicObject};
use kube::core::TypeMeta;
use kube::Resource;
use serde::{de::DeserializeOwned, Serialize};

/// ResourceWrapper converts a typed object to and from the DynamicObject
/// that travels through KubeAPIRequest and KubeAPIResponse.
///
/// Every statically typed resource (k8s-openapi types and custom resources
/// derived with kube::CustomResource) gets the conversion for free.
pub trait ResourceWrapper: Sized {
    fn api_resource() -> ApiResource;

    fn marshal(&self) -> Result<DynamicObject, ParseDynamicObjectError>;

    fn unmarshal(obj: DynamicObject) -> Result<Self, ParseDynamicObjectError>;
}

impl<K> ResourceWrapper for K
where
    K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
{
    fn api_resource() -> ApiResource {
        ApiResource::erase::<K>(&())
    }

    fn marshal(&self) -> Result<DynamicObject, ParseDynamicObjectError> {
        let mut obj: DynamicObject = serde_json::from_value(serde_json::to_value(self)?)?;
        if obj.types.is_none() {
            obj.types = Some(TypeMeta {
                api_version: K::api_version(&()).to_string(),
                kind: K::kind(&()).to_string(),
            });
        }
        Ok(obj)
    }

    fn unmarshal(obj: DynamicObject) -> Result<Self, ParseDynamicObjectError> {
        let types = obj
            .types
            .as_ref()
            .ok_or(ParseDynamicObjectError::MissingTypeMeta)?;
        if types.kind != K::kind(&()) {
            return Err(ParseDynamicObjectError::UnexpectedKind {
                expected: K::kind(&()).to_string(),
                found: types.kind.clone(),
            });
        }
        Ok(serde_json::from_value(serde_json::to_value(obj)?)?)
    }
}
