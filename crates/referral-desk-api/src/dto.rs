// SPDX-License-Identifier: Apache-2.0

use referral_desk_model::{ReferentContact, Referral};
use referral_desk_query::{GroupStats, MetricsReport, ReferralPage};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageDto {
    pub limit: usize,
    pub next_cursor: Option<String>,
    pub prev_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferralListResponse {
    pub api_version: &'static str,
    pub total_count: u64,
    pub page: PageDto,
    pub rows: Vec<Referral>,
}

impl ReferralListResponse {
    #[must_use]
    pub fn from_page(page: ReferralPage, limit: usize) -> Self {
        Self {
            api_version: crate::API_VERSION,
            total_count: page.total_count,
            page: PageDto {
                limit,
                next_cursor: page.next_cursor,
                prev_cursor: page.prev_cursor,
            },
            rows: page.rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactListResponse {
    pub api_version: &'static str,
    pub total_count: usize,
    pub rows: Vec<ReferentContact>,
}

impl ContactListResponse {
    #[must_use]
    pub fn new(rows: Vec<ReferentContact>) -> Self {
        Self {
            api_version: crate::API_VERSION,
            total_count: rows.len(),
            rows,
        }
    }
}

/// Full report, plus one re-sorted group table when `group_by` was asked for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsResponse {
    pub api_version: &'static str,
    pub report: MetricsReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupStats>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedResponse {
    pub id: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub api_version: &'static str,
    pub schema_version: i64,
}
