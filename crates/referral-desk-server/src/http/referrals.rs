// SPDX-License-Identifier: Apache-2.0

use super::{
    actor_from_headers, csv_response, parse_id, parse_json, read_body, respond, QueryMap, RequestId,
};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use referral_desk_api::{
    parse_export_params, parse_import_params, parse_referral_list_params, ApiError,
    DeletedResponse, ReferralListResponse,
};
use referral_desk_ingest::{import_referrals, write_referrals_csv, ImportOptions};
use referral_desk_model::{ReferralDraft, ReferralPatch};
use referral_desk_query::{list_referrals, select_referrals};
use referral_desk_store::MAX_BATCH_SIZE;

pub(crate) async fn list_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<QueryMap>,
) -> Response {
    respond(&request_id, list(&state, &query).await)
}

async fn list(state: &AppState, query: &QueryMap) -> Result<Response, ApiError> {
    let limits = state.config.query_limits();
    let req = parse_referral_list_params(query, &limits)?;
    let store = state.store.lock().await;
    let page = list_referrals(
        store.connection(),
        &req,
        &limits,
        state.config.cursor_secret.as_bytes(),
    )?;
    Ok(Json(ReferralListResponse::from_page(page, req.limit)).into_response())
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
    let draft: ReferralDraft = parse_json(&bytes)?;
    let actor = actor_from_headers(headers);
    let created = state
        .store
        .lock()
        .await
        .insert_referral(draft, &actor, Utc::now())?;
    tracing::info!(id = %created.id, actor = %actor, "referral created");
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
    let id = parse_id("referral", raw_id)?;
    let found = state.store.lock().await.get_referral(&id)?;
    found
        .map(|r| Json(r).into_response())
        .ok_or_else(|| ApiError::not_found("referral", id.as_str()))
}

pub(crate) async fn patch_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(&request_id, update(&state, &id, &headers, body).await)
}

async fn update(
    state: &AppState,
    raw_id: &str,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id("referral", raw_id)?;
    let bytes = read_body(body, state.config.max_body_bytes)?;
    let patch: ReferralPatch = parse_json(&bytes)?;
    if patch.is_empty() {
        return Err(ApiError::invalid_body("patch has no fields to update"));
    }
    let actor = actor_from_headers(headers);
    let updated = state
        .store
        .lock()
        .await
        .update_referral(&id, &patch, &actor, Utc::now())?;
    tracing::info!(id = %updated.id, actor = %actor, "referral updated");
    Ok(Json(updated).into_response())
}

pub(crate) async fn delete_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    respond(&request_id, remove(&state, &id, &headers).await)
}

async fn remove(state: &AppState, raw_id: &str, headers: &HeaderMap) -> Result<Response, ApiError> {
    let id = parse_id("referral", raw_id)?;
    state.store.lock().await.delete_referral(&id)?;
    tracing::info!(id = %id, actor = %actor_from_headers(headers), "referral deleted");
    Ok(Json(DeletedResponse {
        id: id.into_inner(),
        deleted: true,
    })
    .into_response())
}

pub(crate) async fn import_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<QueryMap>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    respond(&request_id, import(&state, &query, &headers, body).await)
}

async fn import(
    state: &AppState,
    query: &QueryMap,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let params = parse_import_params(query, MAX_BATCH_SIZE)?;
    let bytes = read_body(body, state.config.max_body_bytes)?;
    if bytes.is_empty() {
        return Err(ApiError::invalid_body("empty CSV body"));
    }
    let options = ImportOptions {
        batch_size: params.batch_size.unwrap_or(state.config.import_batch_size),
        default_lead_source: params.default_lead_source,
        actor: actor_from_headers(headers),
        dry_run: params.dry_run,
    };
    let mut store = state.store.lock().await;
    let report = import_referrals(&mut store, bytes.as_ref(), &options, Utc::now())?;
    Ok(Json(report).into_response())
}

pub(crate) async fn export_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<QueryMap>,
) -> Response {
    respond(&request_id, export(&state, &query).await)
}

async fn export(state: &AppState, query: &QueryMap) -> Result<Response, ApiError> {
    let params = parse_export_params(query)?;
    let rows = {
        let store = state.store.lock().await;
        select_referrals(store.connection(), &params.filter, params.sort, params.direction)?
    };
    let mut buf = Vec::new();
    let written =
        write_referrals_csv(&mut buf, &rows).map_err(|e| ApiError::internal(e.to_string()))?;
    tracing::info!(rows = written, "referrals exported");
    Ok(csv_response("referrals.csv", buf))
}
