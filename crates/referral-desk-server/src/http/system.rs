// SPDX-License-Identifier: Apache-2.0

use super::{respond, RequestId};
use crate::AppState;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use referral_desk_api::{openapi_v1_spec, ApiError, ApiErrorCode, VersionResponse, API_VERSION};
use serde_json::json;

pub(crate) async fn healthz_handler() -> Response {
    (StatusCode::OK, "ok").into_response()
}

pub(crate) async fn readyz_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Response {
    let result = state
        .store
        .lock()
        .await
        .ping()
        .map(|()| (StatusCode::OK, "ready").into_response())
        .map_err(|e| ApiError::not_ready(e.message));
    respond(&request_id, result)
}

pub(crate) async fn version_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Response {
    let result = state
        .store
        .lock()
        .await
        .schema_version()
        .map(|schema_version| {
            Json(VersionResponse {
                service: crate::CRATE_NAME,
                version: env!("CARGO_PKG_VERSION"),
                api_version: API_VERSION,
                schema_version,
            })
            .into_response()
        })
        .map_err(ApiError::from);
    respond(&request_id, result)
}

pub(crate) async fn openapi_handler() -> Response {
    Json(openapi_v1_spec()).into_response()
}

pub(crate) async fn not_found_handler(
    Extension(request_id): Extension<RequestId>,
    uri: Uri,
) -> Response {
    let err = ApiError::pending(
        ApiErrorCode::NotFound,
        "route not found",
        json!({"path": uri.path()}),
    );
    respond(&request_id, Err(err))
}
