// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::api_method::KubeObjectRef;
use crate::kubernetes_api_objects::error::APIError;
use thiserror::Error;

/// ReconcileError classifies why a reconcile ended in the error state.
///
/// Not-found on an optional lookup is never a ReconcileError; reconcile_core
/// branches on it instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("required object {0} not found")]
    RequiredObjectNotFound(String),
    #[error("conflicting write on {0}")]
    Conflict(String),
    #[error("store unavailable while accessing {key}: {error}")]
    StoreUnavailable { key: String, error: APIError },
    #[error("overlay cannot be merged: {0}")]
    MergeInvalid(String),
    #[error("{0} exists but is not controlled by this resource")]
    NotOwned(String),
    #[error("malformed object {key}: {reason}")]
    MalformedObject { key: String, reason: String },
}

impl ReconcileError {
    /// Translates a store error on a lookup or write that the reconcile cannot do without.
    pub fn from_api_error(key: &KubeObjectRef, error: APIError) -> ReconcileError {
        match error {
            error if error.is_object_not_found() => {
                ReconcileError::RequiredObjectNotFound(key.to_string())
            }
            error if error.is_conflict() => ReconcileError::Conflict(key.to_string()),
            error => ReconcileError::StoreUnavailable {
                key: key.to_string(),
                error,
            },
        }
    }

    /// Retrying a terminal error cannot succeed until the user changes the input.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::RequiredObjectNotFound(_)
            | ReconcileError::Conflict(_)
            | ReconcileError::StoreUnavailable { .. } => true,
            ReconcileError::MergeInvalid(_)
            | ReconcileError::NotOwned(_)
            | ReconcileError::MalformedObject { .. } => false,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ReconcileError::Conflict(_))
    }

    /// Machine-readable reason used in status conditions.
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcileError::RequiredObjectNotFound(_) => "BaseNotFound",
            ReconcileError::Conflict(_) => "Conflict",
            ReconcileError::StoreUnavailable { .. } => "StoreUnavailable",
            ReconcileError::MergeInvalid(_) => "MergeInvalid",
            ReconcileError::NotOwned(_) => "NotOwned",
            ReconcileError::MalformedObject { .. } => "MalformedObject",
        }
    }
}
