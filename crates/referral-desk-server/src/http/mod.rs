// SPDX-License-Identifier: Apache-2.0

pub(crate) mod contacts;
pub(crate) mod metrics;
pub(crate) mod referrals;
pub(crate) mod system;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use referral_desk_api::{map_error, ApiError, ApiErrorEnvelope};
use referral_desk_model::{RecordId, UNKNOWN_ACTOR};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

const MAX_ACTOR_LEN: usize = 256;

pub(crate) type QueryMap = BTreeMap<String, String>;

/// Request id assigned by the tracing middleware.
#[derive(Debug, Clone)]
pub(crate) struct RequestId(pub String);

pub(crate) fn api_error_response(err: ApiError) -> Response {
    let status = StatusCode::from_u16(map_error(&err).status_code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!(code = err.code.as_str(), request_id = %err.request_id, "{}", err.message);
    } else {
        tracing::debug!(code = err.code.as_str(), request_id = %err.request_id, "{}", err.message);
    }
    (status, Json(ApiErrorEnvelope { error: err })).into_response()
}

/// Turns a handler result into a response, stamping errors with the request id.
pub(crate) fn respond(request_id: &RequestId, result: Result<Response, ApiError>) -> Response {
    match result {
        Ok(resp) => resp,
        Err(err) => api_error_response(err.with_request_id(request_id.0.clone())),
    }
}

/// `x-actor` names the user behind a write; absent or unusable values fall back.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-actor")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.chars().count() <= MAX_ACTOR_LEN)
        .unwrap_or(UNKNOWN_ACTOR)
        .to_string()
}

pub(crate) fn read_body(
    body: Result<Bytes, BytesRejection>,
    limit_bytes: usize,
) -> Result<Bytes, ApiError> {
    body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::payload_too_large(limit_bytes)
        } else {
            ApiError::invalid_body(rejection.body_text())
        }
    })
}

pub(crate) fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::invalid_body("empty body"));
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::invalid_body(e.to_string()))
}

pub(crate) fn parse_id(kind: &str, raw: &str) -> Result<RecordId, ApiError> {
    RecordId::parse(raw).map_err(|_| ApiError::not_found(kind, raw))
}

pub(crate) fn csv_response(filename: &str, body: Vec<u8>) -> Response {
    let mut resp = (StatusCode::OK, body).into_response();
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")) {
        resp.headers_mut().insert(header::CONTENT_DISPOSITION, value);
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_header_is_trimmed_and_bounded() {
        let mut headers = HeaderMap::new();
        assert_eq!(actor_from_headers(&headers), "unknown");
        headers.insert("x-actor", HeaderValue::from_static("  alice@example.org "));
        assert_eq!(actor_from_headers(&headers), "alice@example.org");
        let long = "a".repeat(MAX_ACTOR_LEN + 1);
        headers.insert("x-actor", HeaderValue::from_str(&long).expect("header"));
        assert_eq!(actor_from_headers(&headers), "unknown");
    }

    #[test]
    fn malformed_ids_read_as_missing() {
        let err = parse_id("referral", "not-a-uuid").expect_err("bad id");
        assert_eq!(map_error(&err).status_code, 404);
    }
}
