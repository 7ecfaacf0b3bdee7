// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod controllers;
pub mod executable_model;
pub mod kubernetes_api_objects;
pub mod reconciler;
pub mod shim_layer;

use crate::reconciler::exec::error::ReconcileError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("ShimLayerError: {0}")]
    ShimLayerError(String),
    #[error("ReconcileCoreError: {0}")]
    ReconcileCoreError(#[from] ReconcileError),
    #[error("InjectedFault: {0}")]
    InjectedFault(String),
}
