// SPDX-License-Identifier: Apache-2.0

use super::{csv_response, respond, QueryMap, RequestId};
use crate::AppState;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use referral_desk_api::{parse_metrics_params, ApiError, MetricsParams, MetricsResponse, API_VERSION};
use referral_desk_ingest::write_metrics_csv;
use referral_desk_query::{sort_groups, summarize, GroupBy, GroupStats, MetricsReport};

async fn load_report(state: &AppState, params: &MetricsParams) -> Result<MetricsReport, ApiError> {
    params.filter.validate()?;
    let records = state.store.lock().await.all_referrals()?;
    Ok(summarize(&records, &params.filter))
}

fn sorted_groups(report: &MetricsReport, by: GroupBy, params: &MetricsParams) -> Vec<GroupStats> {
    let mut groups = report.groups(by).to_vec();
    sort_groups(&mut groups, params.sort, params.direction);
    groups
}

pub(crate) async fn metrics_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<QueryMap>,
) -> Response {
    respond(&request_id, metrics(&state, &query).await)
}

async fn metrics(state: &AppState, query: &QueryMap) -> Result<Response, ApiError> {
    let params = parse_metrics_params(query)?;
    let report = load_report(state, &params).await?;
    let groups = params.group_by.map(|by| sorted_groups(&report, by, &params));
    Ok(Json(MetricsResponse {
        api_version: API_VERSION,
        group_by: params.group_by.map(GroupBy::as_str),
        groups,
        report,
    })
    .into_response())
}

pub(crate) async fn export_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<QueryMap>,
) -> Response {
    respond(&request_id, export(&state, &query).await)
}

/// One group table as CSV; lead source when no `group_by` is given.
async fn export(state: &AppState, query: &QueryMap) -> Result<Response, ApiError> {
    let params = parse_metrics_params(query)?;
    let by = params.group_by.unwrap_or(GroupBy::LeadSource);
    let report = load_report(state, &params).await?;
    let groups = sorted_groups(&report, by, &params);
    let mut buf = Vec::new();
    write_metrics_csv(&mut buf, &groups).map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(csv_response(&format!("metrics-{}.csv", by.as_str()), buf))
}
