// SPDX-License-Identifier: Apache-2.0

use crate::http::{api_error_response, RequestId};
use crate::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use referral_desk_api::ApiError;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::Instrument;

const MAX_HEADER_VALUE_LEN: usize = 256;

fn normalized_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_HEADER_VALUE_LEN)
        .map(ToString::to_string)
}

pub(crate) fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

/// Assigns the request id (client supplied `x-request-id` wins), runs the
/// request inside an `http.request` span and echoes the id on the response.
pub(crate) async fn request_tracing_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let request_id = normalized_header_value(request.headers(), "x-request-id")
        .unwrap_or_else(|| make_request_id(&state));
    let method = request.method().to_string();
    let route = request.uri().path().to_string();
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %method,
        route = %route,
    );
    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "request finished"
        );
    });
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

const CORS_ALLOW_METHODS: &str = "GET,POST,PATCH,DELETE,OPTIONS";
const CORS_ALLOW_HEADERS: &str = "x-api-key,x-actor,x-request-id,content-type";

/// The request origin, if it is on the configured allow list.
fn permitted_origin(state: &AppState, headers: &HeaderMap) -> Option<HeaderValue> {
    let origin = normalized_header_value(headers, "origin")?;
    if !state.config.cors_allowed_origins.contains(&origin) {
        return None;
    }
    HeaderValue::from_str(&origin).ok()
}

/// Preflights short-circuit with 204. Other responses get the allow-origin
/// header only when the origin is listed.
pub(crate) async fn cors_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let origin = permitted_origin(&state, req.headers());
    let preflight = req.method() == Method::OPTIONS;
    let mut resp = if preflight {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };
    let Some(origin) = origin else {
        return resp;
    };

    let headers = resp.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    if preflight {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        );
    } else {
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    }
    resp
}

/// When keys are required, every `/v1` route needs a listed `x-api-key`.
pub(crate) async fn api_key_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.require_api_key || !req.uri().path().starts_with("/v1/") {
        return next.run(req).await;
    }
    let key = normalized_header_value(req.headers(), "x-api-key");
    let known = key
        .as_deref()
        .is_some_and(|k| state.config.allowed_api_keys.iter().any(|allowed| allowed == k));
    if known {
        return next.run(req).await;
    }
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map_or_else(|| make_request_id(&state), |id| id.0.clone());
    tracing::warn!(request_id = %request_id, "request rejected: missing or unknown api key");
    api_error_response(ApiError::unauthorized().with_request_id(request_id))
}
