// SPDX-License-Identifier: Apache-2.0

use crate::limits::QueryLimits;
use crate::query_error::QueryError;
use chrono::{DateTime, Days, NaiveDate, Utc};
use referral_desk_model::{LeadSource, LevelOfCare};
use referral_desk_store::{escape_like, format_timestamp, normalize_lookup};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// Admin table filter; every set field must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReferralFilter {
    pub program: Option<LevelOfCare>,
    pub admitted: Option<bool>,
    pub referral_sent_to: Option<String>,
    pub lead_source: Option<LeadSource>,
    pub outreach_rep: Option<String>,
    pub name: Option<String>,
    pub referral_source: Option<String>,
    pub insurance_company: Option<String>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Date,
    Name,
}

impl SortKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Name => "name",
        }
    }

    pub fn parse(input: &str) -> Result<Self, QueryError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "date" | "created_at" => Ok(Self::Date),
            "name" => Ok(Self::Name),
            other => Err(QueryError::validation(format!(
                "sort must be date or name, got {other}"
            ))),
        }
    }

    pub(crate) const fn column(self) -> &'static str {
        match self {
            Self::Date => "created_at",
            Self::Name => "name_normalized",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(input: &str) -> Result<Self, QueryError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(QueryError::validation(format!(
                "direction must be asc or desc, got {other}"
            ))),
        }
    }

    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// First instant after `day`, so `< end_bound(day)` includes the whole day.
pub(crate) fn end_bound(day: NaiveDate) -> DateTime<Utc> {
    start_of_day(day.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX))
}

impl ReferralFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self, limits: &QueryLimits) -> Result<(), QueryError> {
        for (field, value) in [
            ("referral_sent_to", &self.referral_sent_to),
            ("outreach_rep", &self.outreach_rep),
            ("name", &self.name),
            ("referral_source", &self.referral_source),
            ("insurance_company", &self.insurance_company),
        ] {
            if let Some(v) = value {
                if v.chars().count() > limits.max_filter_len {
                    return Err(QueryError::validation(format!(
                        "{field} filter exceeds {} characters",
                        limits.max_filter_len
                    )));
                }
            }
        }
        if let (Some(from), Some(to)) = (self.created_from, self.created_to) {
            if from > to {
                return Err(QueryError::validation(
                    "created_from must not be after created_to",
                ));
            }
        }
        Ok(())
    }

    /// Appends WHERE fragments and their positional parameters.
    pub(crate) fn push_sql(&self, where_parts: &mut Vec<String>, params: &mut Vec<Value>) {
        if let Some(program) = self.program {
            where_parts.push("program = ?".to_string());
            params.push(Value::Text(program.as_str().to_string()));
        }
        if let Some(admitted) = self.admitted {
            where_parts.push("admitted = ?".to_string());
            params.push(Value::Integer(i64::from(admitted)));
        }
        if let Some(sent_to) = non_blank(&self.referral_sent_to) {
            where_parts.push("referral_sent_to = ?".to_string());
            params.push(Value::Text(sent_to.to_string()));
        }
        if let Some(lead_source) = self.lead_source {
            where_parts.push("lead_source = ?".to_string());
            params.push(Value::Text(lead_source.as_str().to_string()));
        }
        if let Some(rep) = non_blank(&self.outreach_rep) {
            where_parts.push("outreach_rep = ?".to_string());
            params.push(Value::Text(rep.to_string()));
        }
        for (column, value) in [
            ("name_normalized", &self.name),
            ("referral_source_normalized", &self.referral_source),
            ("insurance_normalized", &self.insurance_company),
        ] {
            if let Some(needle) = non_blank(value) {
                where_parts.push(format!("{column} LIKE ? ESCAPE '!'"));
                params.push(Value::Text(format!(
                    "%{}%",
                    escape_like(&normalize_lookup(needle))
                )));
            }
        }
        if let Some(from) = self.created_from {
            where_parts.push("created_at >= ?".to_string());
            params.push(Value::Text(format_timestamp(start_of_day(from))));
        }
        if let Some(to) = self.created_to {
            where_parts.push("created_at < ?".to_string());
            params.push(Value::Text(format_timestamp(end_bound(to))));
        }
    }
}
