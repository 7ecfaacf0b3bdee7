// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::error::*;
use kube::core::ErrorResponse;

fn api_error(reason: &str, code: u16) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{} error", reason),
        reason: reason.to_string(),
        code,
    })
}

#[test]
pub fn test_api_error_from_kube_error() {
    println!("Testing APIError::from(&kube::Error)...");
    assert_eq!(APIError::ObjectNotFound, APIError::from(&api_error("NotFound", 404)));
    assert_eq!(APIError::ObjectAlreadyExists, APIError::from(&api_error("AlreadyExists", 409)));
    assert_eq!(APIError::Conflict, APIError::from(&api_error("Conflict", 409)));
    assert_eq!(APIError::Forbidden, APIError::from(&api_error("Forbidden", 403)));
    assert_eq!(APIError::Invalid, APIError::from(&api_error("Invalid", 422)));
    assert_eq!(APIError::Timeout, APIError::from(&api_error("Timeout", 504)));
    assert_eq!(APIError::Other, APIError::from(&api_error("TooManyRequests", 429)));
}

#[test]
pub fn test_api_error_classification() {
    println!("Testing APIError classification...");
    assert!(APIError::ObjectNotFound.is_object_not_found());
    assert!(APIError::Conflict.is_conflict());
    assert!(APIError::ObjectAlreadyExists.is_conflict());
    assert!(!APIError::InternalError.is_conflict());
}
