// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::api_method::KubeObjectRef;
use kube::api::DynamicObject;
use std::collections::BTreeMap;

/// ObjectMap is the stored state of the API server model: every object keyed
/// by its kind, namespace and name.
#[derive(Debug, Clone, Default)]
pub struct ObjectMap {
    inner: BTreeMap<KubeObjectRef, DynamicObject>,
}

impl ObjectMap {
    pub fn new() -> Self {
        ObjectMap {
            inner: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains_key(&self, key: &KubeObjectRef) -> bool {
        self.inner.contains_key(key)
    }

    pub fn get(&self, key: &KubeObjectRef) -> Option<&DynamicObject> {
        self.inner.get(key)
    }

    pub fn insert(&mut self, key: KubeObjectRef, value: DynamicObject) -> Option<DynamicObject> {
        self.inner.insert(key, value)
    }

    pub fn remove(&mut self, key: &KubeObjectRef) -> Option<DynamicObject> {
        self.inner.remove(key)
    }
}
