// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

/// filter_controller_references returns the owner references that claim to be
/// the managing controller of the object. A valid object has at most one.
pub fn filter_controller_references(owner_refs: &[OwnerReference]) -> Vec<&OwnerReference> {
    owner_refs
        .iter()
        .filter(|r| r.controller == Some(true))
        .collect()
}

/// is_controlled_by checks whether the object's controller reference points
/// at the owner. Owners are matched by uid, so a re-created owner with the
/// same name does not inherit its predecessor's objects.
pub fn is_controlled_by(meta: &ObjectMeta, owner_ref: &OwnerReference) -> bool {
    meta.owner_references.as_ref().map_or(false, |refs| {
        refs.iter().any(|r| {
            r.controller == Some(true)
                && r.uid == owner_ref.uid
                && r.kind == owner_ref.kind
                && r.api_version == owner_ref.api_version
        })
    })
}

/// Adds the owner reference to the object, replacing any existing reference
/// to the same owner.
pub fn ensure_owner_reference(meta: &mut ObjectMeta, owner_ref: OwnerReference) {
    let refs = meta.owner_references.get_or_insert_with(Vec::new);
    refs.retain(|r| r.uid != owner_ref.uid);
    refs.push(owner_ref);
}
