// SPDX-License-Identifier: Apache-2.0

//! Reporting aggregates computed in memory over the full referral set.

use crate::filters::{end_bound, start_of_day, SortDirection};
use crate::query_error::QueryError;
use chrono::NaiveDate;
use referral_desk_model::{LeadSource, LevelOfCare, Quarter, Referral};
use referral_desk_store::normalize_lookup;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Label for records without a value in the grouped column.
pub const UNKNOWN_GROUP: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsFilter {
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    pub program: Option<LevelOfCare>,
    pub referral_source: Option<String>,
    pub referral_sent_to: Option<String>,
    pub lead_source: Option<LeadSource>,
    pub outreach_rep: Option<String>,
}

impl MetricsFilter {
    pub fn validate(&self) -> Result<(), QueryError> {
        if let (Some(from), Some(to)) = (self.created_from, self.created_to) {
            if from > to {
                return Err(QueryError::validation(
                    "created_from must not be after created_to",
                ));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn matches(&self, r: &Referral) -> bool {
        if let Some(from) = self.created_from {
            if r.created_at < start_of_day(from) {
                return false;
            }
        }
        if let Some(to) = self.created_to {
            if r.created_at >= end_bound(to) {
                return false;
            }
        }
        if self.program.is_some() && r.program != self.program {
            return false;
        }
        if self.lead_source.is_some_and(|ls| ls != r.lead_source) {
            return false;
        }
        if let Some(needle) = non_blank(&self.referral_source) {
            let needle = normalize_lookup(needle);
            let hit = r
                .referral_source
                .as_deref()
                .is_some_and(|v| normalize_lookup(v).contains(&needle));
            if !hit {
                return false;
            }
        }
        same_folded(&self.referral_sent_to, &r.referral_sent_to)
            && same_folded(&self.outreach_rep, &r.outreach_rep)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn same_folded(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match non_blank(wanted) {
        None => true,
        Some(w) => actual
            .as_deref()
            .is_some_and(|a| normalize_lookup(a) == normalize_lookup(w)),
    }
}

/// Percent admitted, one decimal; `0.0` for an empty group.
#[must_use]
pub fn conversion_rate(admitted: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(admitted as f64 / total as f64 * 100.0)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Overview {
    pub total: u64,
    pub admitted: u64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GroupStats {
    pub key: String,
    pub total: u64,
    pub admitted: u64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CountStats {
    pub key: String,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuarterStats {
    pub quarter: Quarter,
    pub total: u64,
    pub admitted: u64,
    pub conversion_rate: f64,
    pub delta_total: Option<i64>,
    pub delta_conversion_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsReport {
    pub overview: Overview,
    pub by_lead_source: Vec<GroupStats>,
    pub by_referral_source: Vec<GroupStats>,
    pub by_referral_sent_to: Vec<GroupStats>,
    pub by_outreach_rep: Vec<GroupStats>,
    pub by_program: Vec<GroupStats>,
    pub by_insurance_company: Vec<GroupStats>,
    pub referral_out: Vec<CountStats>,
    pub quarters: Vec<QuarterStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum GroupBy {
    LeadSource,
    ReferralSource,
    ReferralSentTo,
    OutreachRep,
    Program,
    InsuranceCompany,
}

impl GroupBy {
    pub const ALL: [Self; 6] = [
        Self::LeadSource,
        Self::ReferralSource,
        Self::ReferralSentTo,
        Self::OutreachRep,
        Self::Program,
        Self::InsuranceCompany,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LeadSource => "lead_source",
            Self::ReferralSource => "referral_source",
            Self::ReferralSentTo => "referral_sent_to",
            Self::OutreachRep => "outreach_rep",
            Self::Program => "program",
            Self::InsuranceCompany => "insurance_company",
        }
    }

    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let wanted = input.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| QueryError::validation(format!("unknown group_by: {input}")))
    }

    fn value(self, r: &Referral) -> Option<&str> {
        match self {
            Self::LeadSource => Some(r.lead_source.as_str()),
            Self::ReferralSource => r.referral_source.as_deref(),
            Self::ReferralSentTo => r.referral_sent_to.as_deref(),
            Self::OutreachRep => r.outreach_rep.as_deref(),
            Self::Program => r.program.map(LevelOfCare::as_str),
            Self::InsuranceCompany => r.insurance_company.as_deref(),
        }
    }
}

impl MetricsReport {
    #[must_use]
    pub fn groups(&self, by: GroupBy) -> &[GroupStats] {
        match by {
            GroupBy::LeadSource => &self.by_lead_source,
            GroupBy::ReferralSource => &self.by_referral_source,
            GroupBy::ReferralSentTo => &self.by_referral_sent_to,
            GroupBy::OutreachRep => &self.by_outreach_rep,
            GroupBy::Program => &self.by_program,
            GroupBy::InsuranceCompany => &self.by_insurance_company,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupColumn {
    Key,
    #[default]
    Total,
    Admitted,
    Rate,
}

impl GroupColumn {
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "key" | "group" => Ok(Self::Key),
            "total" => Ok(Self::Total),
            "admitted" => Ok(Self::Admitted),
            "rate" | "conversion_rate" => Ok(Self::Rate),
            other => Err(QueryError::validation(format!(
                "sort column must be key, total, admitted or rate, got {other}"
            ))),
        }
    }
}

/// Stable sort by `column`; equal values fall back to key ascending.
pub fn sort_groups(groups: &mut [GroupStats], column: GroupColumn, direction: SortDirection) {
    groups.sort_by(|a, b| {
        let primary = match column {
            GroupColumn::Key => a.key.cmp(&b.key),
            GroupColumn::Total => a.total.cmp(&b.total),
            GroupColumn::Admitted => a.admitted.cmp(&b.admitted),
            GroupColumn::Rate => a.conversion_rate.total_cmp(&b.conversion_rate),
        };
        let primary = match direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        if primary == Ordering::Equal {
            a.key.cmp(&b.key)
        } else {
            primary
        }
    });
}

#[derive(Default)]
struct Tally {
    label: String,
    total: u64,
    admitted: u64,
}

fn group(records: &[&Referral], by: GroupBy) -> Vec<GroupStats> {
    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
    for r in records {
        let raw = by
            .value(r)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN_GROUP);
        let tally = tallies.entry(normalize_lookup(raw)).or_insert_with(|| Tally {
            label: raw.to_string(),
            ..Tally::default()
        });
        tally.total += 1;
        tally.admitted += u64::from(r.admitted);
    }
    let mut out: Vec<GroupStats> = tallies
        .into_values()
        .map(|t| GroupStats {
            conversion_rate: conversion_rate(t.admitted, t.total),
            key: t.label,
            total: t.total,
            admitted: t.admitted,
        })
        .collect();
    sort_groups(&mut out, GroupColumn::Total, SortDirection::Desc);
    out
}

fn referral_out_counts(records: &[&Referral]) -> Vec<CountStats> {
    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
    for r in records {
        let Some(out) = r.referral_out.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
            continue;
        };
        let tally = tallies.entry(normalize_lookup(out)).or_insert_with(|| Tally {
            label: out.to_string(),
            ..Tally::default()
        });
        tally.total += 1;
    }
    let mut out: Vec<CountStats> = tallies
        .into_values()
        .map(|t| CountStats {
            key: t.label,
            total: t.total,
        })
        .collect();
    out.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
    out
}

fn signed(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn quarter_series(records: &[&Referral]) -> Vec<QuarterStats> {
    let mut per_quarter: BTreeMap<Quarter, (u64, u64)> = BTreeMap::new();
    for r in records {
        let slot = per_quarter
            .entry(Quarter::from_datetime(r.created_at))
            .or_insert((0, 0));
        slot.0 += 1;
        slot.1 += u64::from(r.admitted);
    }
    let (Some(first), Some(last)) = (
        per_quarter.keys().next().copied(),
        per_quarter.keys().next_back().copied(),
    ) else {
        return Vec::new();
    };

    let mut out: Vec<QuarterStats> = Vec::new();
    let mut cursor = first;
    while cursor <= last {
        let (total, admitted) = per_quarter.get(&cursor).copied().unwrap_or((0, 0));
        let rate = conversion_rate(admitted, total);
        let (delta_total, delta_conversion_rate) = match out.last() {
            Some(prev) => (
                Some(signed(total) - signed(prev.total)),
                Some(round1(rate - prev.conversion_rate)),
            ),
            None => (None, None),
        };
        out.push(QuarterStats {
            quarter: cursor,
            total,
            admitted,
            conversion_rate: rate,
            delta_total,
            delta_conversion_rate,
        });
        cursor = cursor.next();
    }
    out
}

/// Aggregates every record matching `filter`.
#[must_use]
pub fn summarize(records: &[Referral], filter: &MetricsFilter) -> MetricsReport {
    let selected: Vec<&Referral> = records.iter().filter(|r| filter.matches(r)).collect();
    let total = selected.len() as u64;
    let admitted = selected.iter().filter(|r| r.admitted).count() as u64;
    MetricsReport {
        overview: Overview {
            total,
            admitted,
            conversion_rate: conversion_rate(admitted, total),
        },
        by_lead_source: group(&selected, GroupBy::LeadSource),
        by_referral_source: group(&selected, GroupBy::ReferralSource),
        by_referral_sent_to: group(&selected, GroupBy::ReferralSentTo),
        by_outreach_rep: group(&selected, GroupBy::OutreachRep),
        by_program: group(&selected, GroupBy::Program),
        by_insurance_company: group(&selected, GroupBy::InsuranceCompany),
        referral_out: referral_out_counts(&selected),
        quarters: quarter_series(&selected),
    }
}
