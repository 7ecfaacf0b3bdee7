// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// Errors returned by the object store, independent of the backend serving them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum APIError {
    #[error("BadRequest")]
    BadRequest,
    #[error("Conflict")]
    Conflict,
    #[error("Forbidden")]
    Forbidden,
    #[error("Invalid")]
    Invalid,
    #[error("ObjectAlreadyExists")]
    ObjectAlreadyExists,
    #[error("ObjectNotFound")]
    ObjectNotFound,
    #[error("InternalError")]
    InternalError,
    #[error("Timeout")]
    Timeout,
    #[error("ServerTimeout")]
    ServerTimeout,
    #[error("Other")]
    Other,
}

impl APIError {
    pub fn is_object_not_found(&self) -> bool {
        matches!(self, APIError::ObjectNotFound)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, APIError::Conflict | APIError::ObjectAlreadyExists)
    }
}

// TODO: match more error types (e.g., TooManyRequests, Gone).
impl From<&kube::Error> for APIError {
    fn from(error: &kube::Error) -> Self {
        match error {
            kube::Error::Api(error_resp) => match error_resp.reason.as_str() {
                "NotFound" => APIError::ObjectNotFound,
                "AlreadyExists" => APIError::ObjectAlreadyExists,
                "BadRequest" => APIError::BadRequest,
                "Conflict" => APIError::Conflict,
                "Forbidden" => APIError::Forbidden,
                "Invalid" => APIError::Invalid,
                "InternalError" => APIError::InternalError,
                "Timeout" => APIError::Timeout,
                "ServerTimeout" => APIError::ServerTimeout,
                _ => APIError::Other,
            },
            _ => APIError::Other,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseDynamicObjectError {
    #[error("object has no type information")]
    MissingTypeMeta,
    #[error("expected kind {expected}, found {found}")]
    UnexpectedKind { expected: String, found: String },
    #[error("failed to convert object: {0}")]
    SerdeError(#[from] serde_json::Error),
}
