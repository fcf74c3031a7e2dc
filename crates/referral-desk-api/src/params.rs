// SPDX-License-Identifier: Apache-2.0

use crate::errors::ApiError;
use chrono::NaiveDate;
use referral_desk_model::{parse_iso_day, LeadSource, LevelOfCare};
use referral_desk_query::{
    GroupBy, GroupColumn, MetricsFilter, QueryLimits, ReferralFilter, ReferralListRequest,
    SortDirection, SortKey,
};
use referral_desk_store::ContactFilter;
use std::collections::BTreeMap;

pub const MAX_CURSOR_BYTES: usize = 4096;

const FILTER_PARAMS: [&str; 10] = [
    "program",
    "admitted",
    "referral_sent_to",
    "lead_source",
    "outreach_rep",
    "name",
    "referral_source",
    "insurance_company",
    "created_from",
    "created_to",
];
const PAGING_PARAMS: [&str; 4] = ["sort", "direction", "limit", "cursor"];
const METRICS_PARAMS: [&str; 10] = [
    "created_from",
    "created_to",
    "program",
    "referral_source",
    "referral_sent_to",
    "lead_source",
    "outreach_rep",
    "group_by",
    "sort",
    "direction",
];
const CONTACT_PARAMS: [&str; 2] = ["referral_partner", "referral_rep"];
const IMPORT_PARAMS: [&str; 3] = ["batch_size", "default_lead_source", "dry_run"];

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsParams {
    pub filter: MetricsFilter,
    pub group_by: Option<GroupBy>,
    pub sort: GroupColumn,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportParams {
    pub filter: ReferralFilter,
    pub sort: SortKey,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportParams {
    pub batch_size: Option<usize>,
    pub default_lead_source: Option<LeadSource>,
    pub dry_run: bool,
}

fn reject_unknown<'a>(
    query: &BTreeMap<String, String>,
    allowed: impl IntoIterator<Item = &'a [&'a str]>,
) -> Result<(), ApiError> {
    let allowed: Vec<&str> = allowed.into_iter().flatten().copied().collect();
    match query.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(unknown) => Err(ApiError::unknown_param(unknown)),
        None => Ok(()),
    }
}

fn text(query: &BTreeMap<String, String>, name: &str) -> Option<String> {
    query
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parsed<T, E>(
    query: &BTreeMap<String, String>,
    name: &str,
    parse: impl Fn(&str) -> Result<T, E>,
) -> Result<Option<T>, ApiError> {
    match query.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse(raw)
            .map(Some)
            .map_err(|_| ApiError::invalid_param(name, raw)),
    }
}

fn parse_flag(raw: &str) -> Result<bool, ()> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(()),
    }
}

fn parse_day(raw: &str) -> Result<NaiveDate, ()> {
    parse_iso_day(raw).ok_or(())
}

fn check_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<(), ApiError> {
    match (from, to) {
        (Some(f), Some(t)) if f > t => Err(ApiError::invalid_param("created_from", &f.to_string())),
        _ => Ok(()),
    }
}

/// Admin-table filter fields shared by the list and export endpoints.
pub fn parse_referral_filter(query: &BTreeMap<String, String>) -> Result<ReferralFilter, ApiError> {
    let filter = ReferralFilter {
        program: parsed(query, "program", LevelOfCare::parse)?,
        admitted: parsed(query, "admitted", parse_flag)?,
        referral_sent_to: text(query, "referral_sent_to"),
        lead_source: parsed(query, "lead_source", LeadSource::parse)?,
        outreach_rep: text(query, "outreach_rep"),
        name: text(query, "name"),
        referral_source: text(query, "referral_source"),
        insurance_company: text(query, "insurance_company"),
        created_from: parsed(query, "created_from", parse_day)?,
        created_to: parsed(query, "created_to", parse_day)?,
    };
    check_range(filter.created_from, filter.created_to)?;
    Ok(filter)
}

pub fn parse_referral_list_params(
    query: &BTreeMap<String, String>,
    limits: &QueryLimits,
) -> Result<ReferralListRequest, ApiError> {
    reject_unknown(query, [&FILTER_PARAMS[..], &PAGING_PARAMS[..]])?;
    let limit = match query.get("limit") {
        Some(raw) => {
            let value = raw
                .parse::<usize>()
                .map_err(|_| ApiError::invalid_param("limit", raw))?;
            if value == 0 || value > limits.max_limit {
                return Err(ApiError::invalid_param("limit", raw));
            }
            value
        }
        None => limits.default_limit,
    };
    let cursor = query.get("cursor").cloned().filter(|c| !c.is_empty());
    if cursor.as_ref().is_some_and(|c| c.len() > MAX_CURSOR_BYTES) {
        return Err(ApiError::invalid_cursor("cursor too long"));
    }
    Ok(ReferralListRequest {
        filter: parse_referral_filter(query)?,
        sort: parsed(query, "sort", SortKey::parse)?.unwrap_or_default(),
        direction: parsed(query, "direction", SortDirection::parse)?.unwrap_or_default(),
        limit,
        cursor,
    })
}

/// Export takes the list filters plus an ordering, but no paging.
pub fn parse_export_params(query: &BTreeMap<String, String>) -> Result<ExportParams, ApiError> {
    reject_unknown(query, [&FILTER_PARAMS[..], &["sort", "direction"][..]])?;
    Ok(ExportParams {
        filter: parse_referral_filter(query)?,
        sort: parsed(query, "sort", SortKey::parse)?.unwrap_or_default(),
        direction: parsed(query, "direction", SortDirection::parse)?.unwrap_or_default(),
    })
}

pub fn parse_metrics_params(query: &BTreeMap<String, String>) -> Result<MetricsParams, ApiError> {
    reject_unknown(query, [&METRICS_PARAMS[..]])?;
    let filter = MetricsFilter {
        created_from: parsed(query, "created_from", parse_day)?,
        created_to: parsed(query, "created_to", parse_day)?,
        program: parsed(query, "program", LevelOfCare::parse)?,
        referral_source: text(query, "referral_source"),
        referral_sent_to: text(query, "referral_sent_to"),
        lead_source: parsed(query, "lead_source", LeadSource::parse)?,
        outreach_rep: text(query, "outreach_rep"),
    };
    check_range(filter.created_from, filter.created_to)?;
    Ok(MetricsParams {
        filter,
        group_by: parsed(query, "group_by", GroupBy::parse)?,
        sort: parsed(query, "sort", GroupColumn::parse)?.unwrap_or_default(),
        direction: parsed(query, "direction", SortDirection::parse)?.unwrap_or_default(),
    })
}

pub fn parse_contact_filter(query: &BTreeMap<String, String>) -> Result<ContactFilter, ApiError> {
    reject_unknown(query, [&CONTACT_PARAMS[..]])?;
    Ok(ContactFilter {
        referral_partner: text(query, "referral_partner"),
        referral_rep: text(query, "referral_rep"),
    })
}

pub fn parse_import_params(
    query: &BTreeMap<String, String>,
    max_batch_size: usize,
) -> Result<ImportParams, ApiError> {
    reject_unknown(query, [&IMPORT_PARAMS[..]])?;
    let batch_size = parsed(query, "batch_size", |raw| raw.parse::<usize>())?;
    if let Some(size) = batch_size {
        if size == 0 || size > max_batch_size {
            return Err(ApiError::invalid_param("batch_size", &size.to_string()));
        }
    }
    Ok(ImportParams {
        batch_size,
        default_lead_source: parsed(query, "default_lead_source", LeadSource::parse)?,
        dry_run: parsed(query, "dry_run", parse_flag)?.unwrap_or(false),
    })
}
