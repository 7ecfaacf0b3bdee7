// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::reconciler::exec::error::ReconcileError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentVersionReconcileStep {
    Init,
    AfterAddFinalizer,
    AfterGetBase,
    AfterGetDerived,
    AfterCreateDerived,
    AfterUpdateDerived,
    AfterUpdateStatus,
    AfterGetDerivedForCleanup,
    AfterDeleteDerived,
    AfterRemoveFinalizer,
    Done,
    Error(ReconcileError),
}
