// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::api_method::{KubeAPIRequest, KubeAPIResponse};
use crate::reconciler::exec::error::ReconcileError;
use kube::runtime::reflector::ObjectRef;
use std::sync::Arc;

/// Reconciler is the interface between a controller's reconcile logic and the shim layer.
///
/// A reconcile is a sequence of reconcile_core calls. Each call takes the response of the
/// request issued by the previous call (None for the first call and for steps that issued
/// no request), and returns the next local state with at most one request to the store.
/// reconcile_core never talks to the store itself, so its decisions depend only on the
/// custom resource, the state and the responses fed back by the shim layer.
pub trait Reconciler {
    /// The local state carried across reconcile_core calls within one reconcile.
    type S;
    /// The custom resource type.
    type K: kube::Resource<DynamicType = ()>;
    /// The kind of object this reconciler creates and owns.
    type Owned;

    fn reconcile_init_state(&self) -> Self::S;

    fn reconcile_core(
        &self,
        cr: &Self::K,
        resp_o: Option<KubeAPIResponse>,
        state: Self::S,
    ) -> (Self::S, Option<KubeAPIRequest>);

    fn reconcile_done(&self, state: &Self::S) -> bool;

    /// Returns the classified failure if the reconcile ended in the error state.
    fn reconcile_error(&self, state: &Self::S) -> Option<ReconcileError>;

    /// Maps a change on an object of the owned kind that the reconciler reads as an
    /// input (rather than one it created) to the custom resources depending on it.
    fn dependents(_obj: &Self::Owned, _crs: &[Arc<Self::K>]) -> Vec<ObjectRef<Self::K>> {
        Vec::new()
    }
}
