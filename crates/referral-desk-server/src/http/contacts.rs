// SPDX-License-Identifier: Apache-2.0

use super::{actor_from_headers, parse_id, parse_json, read_body, respond, QueryMap, RequestId};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use referral_desk_api::{parse_contact_filter, ApiError, ContactListResponse, DeletedResponse};
use referral_desk_model::{ContactDraft, ContactPatch};

const KIND: &str = "referent contact";

pub(crate) async fn list_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<QueryMap>,
) -> Response {
    respond(&request_id, list(&state, &query).await)
}

async fn list(state: &AppState, query: &QueryMap) -> Result<Response, ApiError> {
    let filter = parse_contact_filter(query)?;
    let rows = state.store.lock().await.list_contacts(&filter)?;
    Ok(Json(ContactListResponse::new(rows)).into_response())
}

pub(crate) async fn create_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(&request_id, create(&state, &headers, body).await)
}

async fn create(
    state: &AppState,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let bytes = read_body(body, state.config.max_body_bytes)?;
    let draft: ContactDraft = parse_json(&bytes)?;
    let actor = actor_from_headers(headers);
    let created = state
        .store
        .lock()
        .await
        .insert_contact(draft, &actor, Utc::now())?;
    tracing::info!(id = %created.id, actor = %actor, "referent contact created");
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub(crate) async fn get_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Response {
    respond(&request_id, fetch(&state, &id).await)
}

async fn fetch(state: &AppState, raw_id: &str) -> Result<Response, ApiError> {
    let id = parse_id(KIND, raw_id)?;
    state
        .store
        .lock()
        .await
        .get_contact(&id)?
        .map(|c| Json(c).into_response())
        .ok_or_else(|| ApiError::not_found(KIND, id.as_str()))
}

pub(crate) async fn patch_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(&request_id, update(&state, &id, body).await)
}

async fn update(
    state: &AppState,
    raw_id: &str,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(KIND, raw_id)?;
    let bytes = read_body(body, state.config.max_body_bytes)?;
    let patch: ContactPatch = parse_json(&bytes)?;
    let updated = state.store.lock().await.update_contact(&id, &patch)?;
    Ok(Json(updated).into_response())
}

pub(crate) async fn delete_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Response {
    respond(&request_id, remove(&state, &id).await)
}

async fn remove(state: &AppState, raw_id: &str) -> Result<Response, ApiError> {
    let id = parse_id(KIND, raw_id)?;
    state.store.lock().await.delete_contact(&id)?;
    Ok(Json(DeletedResponse {
        id: id.into_inner(),
        deleted: true,
    })
    .into_response())
}
