// SPDX-License-Identifier: Apache-2.0

use referral_desk_model::FieldIssue;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const UNASSIGNED_REQUEST_ID: &str = "req-unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ApiErrorCode {
    InvalidQueryParameter,
    InvalidCursor,
    InvalidBody,
    ValidationFailed,
    NotFound,
    Unauthorized,
    PayloadTooLarge,
    NotReady,
    Internal,
}

impl ApiErrorCode {
    pub const ALL: [Self; 9] = [
        Self::InvalidQueryParameter,
        Self::InvalidCursor,
        Self::InvalidBody,
        Self::ValidationFailed,
        Self::NotFound,
        Self::Unauthorized,
        Self::PayloadTooLarge,
        Self::NotReady,
        Self::Internal,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidQueryParameter => "InvalidQueryParameter",
            Self::InvalidCursor => "InvalidCursor",
            Self::InvalidBody => "InvalidBody",
            Self::ValidationFailed => "ValidationFailed",
            Self::NotFound => "NotFound",
            Self::Unauthorized => "Unauthorized",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::NotReady => "NotReady",
            Self::Internal => "Internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
    pub request_id: String,
}

/// Wire shape of every error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiErrorEnvelope {
    pub error: ApiError,
}

impl ApiError {
    #[must_use]
    pub fn new(
        code: ApiErrorCode,
        message: impl Into<String>,
        details: Value,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            request_id: request_id.into(),
        }
    }

    /// An error whose request id is filled in by the HTTP layer on the way out.
    #[must_use]
    pub fn pending(code: ApiErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self::new(code, message, details, UNASSIGNED_REQUEST_ID)
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    #[must_use]
    pub fn invalid_param(name: &str, value: &str) -> Self {
        Self::pending(
            ApiErrorCode::InvalidQueryParameter,
            format!("invalid query parameter: {name}"),
            json!({"field_errors":[{"parameter": name, "reason": "invalid", "value": value}]}),
        )
    }

    #[must_use]
    pub fn unknown_param(name: &str) -> Self {
        Self::pending(
            ApiErrorCode::InvalidQueryParameter,
            format!("unknown query parameter: {name}"),
            json!({"field_errors":[{"parameter": name, "reason": "unknown"}]}),
        )
    }

    #[must_use]
    pub fn invalid_cursor(reason: &str) -> Self {
        Self::pending(
            ApiErrorCode::InvalidCursor,
            "invalid cursor",
            json!({"reason": reason}),
        )
    }

    #[must_use]
    pub fn invalid_body(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::pending(
            ApiErrorCode::InvalidBody,
            "request body could not be read",
            json!({"reason": reason}),
        )
    }

    #[must_use]
    pub fn validation_failed(issues: &[FieldIssue]) -> Self {
        let field_errors: Vec<Value> = issues
            .iter()
            .map(|i| json!({"field": i.field, "reason": i.reason}))
            .collect();
        Self::pending(
            ApiErrorCode::ValidationFailed,
            "validation failed",
            json!({"field_errors": field_errors}),
        )
    }

    #[must_use]
    pub fn not_found(kind: &str, id: &str) -> Self {
        Self::pending(
            ApiErrorCode::NotFound,
            format!("{kind} not found"),
            json!({"kind": kind, "id": id}),
        )
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::pending(
            ApiErrorCode::Unauthorized,
            "missing or unknown api key",
            json!({}),
        )
    }

    #[must_use]
    pub fn payload_too_large(limit_bytes: usize) -> Self {
        Self::pending(
            ApiErrorCode::PayloadTooLarge,
            "request body too large",
            json!({"limit_bytes": limit_bytes}),
        )
    }

    #[must_use]
    pub fn not_ready(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::pending(
            ApiErrorCode::NotReady,
            "store not ready",
            json!({"reason": reason}),
        )
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::pending(ApiErrorCode::Internal, message, json!({}))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

const _: fn() = || {
    fn assert_traits<T: Serialize + for<'de> Deserialize<'de>>() {}
    assert_traits::<ApiErrorCode>();
    assert_traits::<ApiErrorEnvelope>();
};
