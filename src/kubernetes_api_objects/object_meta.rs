// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

/// Accessors on ObjectMeta that reconcile_core and the executable model
/// rely on for finalizers, deletion and ownership.
pub trait ObjectMetaExt {
    fn has_deletion_timestamp(&self) -> bool;

    fn finalizers_contains(&self, finalizer: &str) -> bool;

    /// Appends the finalizer unless it is already present.
    fn add_finalizer(&mut self, finalizer: &str);

    /// Removes every occurrence of the finalizer. An emptied list becomes None.
    fn remove_finalizer(&mut self, finalizer: &str);

    fn has_finalizers(&self) -> bool;

    fn resource_version_eq(&self, other: &ObjectMeta) -> bool;

    fn uid_eq(&self, other: &ObjectMeta) -> bool;

    fn owner_references_contains(&self, owner_ref: &OwnerReference) -> bool;

    /// Returns the owner reference marked as controller, if any.
    fn controller_reference(&self) -> Option<&OwnerReference>;
}

impl ObjectMetaExt for ObjectMeta {
    fn has_deletion_timestamp(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    fn finalizers_contains(&self, finalizer: &str) -> bool {
        self.finalizers
            .as_ref()
            .map_or(false, |finalizers| finalizers.iter().any(|f| f == finalizer))
    }

    fn add_finalizer(&mut self, finalizer: &str) {
        if self.finalizers_contains(finalizer) {
            return;
        }
        self.finalizers
            .get_or_insert_with(Vec::new)
            .push(finalizer.to_string());
    }

    fn remove_finalizer(&mut self, finalizer: &str) {
        if let Some(finalizers) = self.finalizers.as_mut() {
            finalizers.retain(|f| f != finalizer);
            if finalizers.is_empty() {
                self.finalizers = None;
            }
        }
    }

    fn has_finalizers(&self) -> bool {
        self.finalizers.as_ref().map_or(false, |f| !f.is_empty())
    }

    fn resource_version_eq(&self, other: &ObjectMeta) -> bool {
        self.resource_version == other.resource_version
    }

    fn uid_eq(&self, other: &ObjectMeta) -> bool {
        self.uid == other.uid
    }

    fn owner_references_contains(&self, owner_ref: &OwnerReference) -> bool {
        self.owner_references
            .as_ref()
            .map_or(false, |refs| refs.contains(owner_ref))
    }

    fn controller_reference(&self) -> Option<&OwnerReference> {
        self.owner_references
            .as_ref()
            .and_then(|refs| refs.iter().find(|r| r.controller == Some(true)))
    }
}
