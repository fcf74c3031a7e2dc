// SPDX-License-Identifier: Apache-2.0

use crate::ids::RecordId;
use crate::serde_helpers::{blank_as_cleared, blank_as_none};
use crate::validation::{
    check_optional, check_required, clean_optional, ValidationError, NAME_MAX_LEN, NOTES_MAX_LEN,
    TEXT_MAX_LEN,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
#[non_exhaustive]
pub enum LeadSource {
    #[default]
    Insurance,
    Kaiser,
    Outreach,
    Direct,
}

impl LeadSource {
    pub const ALL: [Self; 4] = [Self::Insurance, Self::Kaiser, Self::Outreach, Self::Direct];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insurance => "Insurance",
            Self::Kaiser => "Kaiser",
            Self::Outreach => "Outreach",
            Self::Direct => "Direct",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                ValidationError::single(
                    "lead_source",
                    "must be one of Insurance, Kaiser, Outreach, Direct",
                )
            })
    }
}

impl Display for LeadSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for LeadSource {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LeadSource> for String {
    fn from(value: LeadSource) -> Self {
        value.as_str().to_string()
    }
}

/// Program / level of care the person was referred into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[non_exhaustive]
pub enum LevelOfCare {
    Dtx,
    Rtc,
    Php,
    Iop,
}

impl LevelOfCare {
    pub const ALL: [Self; 4] = [Self::Dtx, Self::Rtc, Self::Php, Self::Iop];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dtx => "DTX",
            Self::Rtc => "RTC",
            Self::Php => "PHP",
            Self::Iop => "IOP",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ValidationError::single("program", "must be one of DTX, RTC, PHP, IOP"))
    }
}

impl Display for LevelOfCare {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for LevelOfCare {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LevelOfCare> for String {
    fn from(value: LevelOfCare) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub lead_source: LeadSource,
    pub referral_source: Option<String>,
    pub referral_out: Option<String>,
    pub insurance_company: Option<String>,
    pub program: Option<LevelOfCare>,
    pub referral_sent_to: Option<String>,
    pub admitted: bool,
    pub outreach_rep: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl Referral {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_referral_fields(
            &self.first_name,
            &self.last_name,
            Some(self.lead_source),
            self.outreach_rep.as_deref(),
            [
                ("referral_source", self.referral_source.as_deref()),
                ("referral_out", self.referral_out.as_deref()),
                ("insurance_company", self.insurance_company.as_deref()),
                ("referral_sent_to", self.referral_sent_to.as_deref()),
            ],
            self.notes.as_deref(),
        )
        .into_result()
    }
}

/// User-supplied fields of a new referral, as submitted by the intake form or an import row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferralDraft {
    pub first_name: String,
    pub last_name: String,
    pub lead_source: Option<LeadSource>,
    pub referral_source: Option<String>,
    pub referral_out: Option<String>,
    pub insurance_company: Option<String>,
    #[serde(deserialize_with = "blank_as_none::deserialize")]
    pub program: Option<LevelOfCare>,
    pub referral_sent_to: Option<String>,
    pub admitted: bool,
    pub outreach_rep: Option<String>,
    pub notes: Option<String>,
    /// Only set by imports; the store stamps the write time otherwise.
    #[serde(skip)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Default for ReferralDraft {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            lead_source: Some(LeadSource::Insurance),
            referral_source: None,
            referral_out: None,
            insurance_company: None,
            program: None,
            referral_sent_to: None,
            admitted: false,
            outreach_rep: None,
            notes: None,
            created_at: None,
        }
    }
}

impl ReferralDraft {
    #[must_use]
    pub fn new(first_name: &str, last_name: &str, lead_source: LeadSource) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            lead_source: Some(lead_source),
            ..Self::default()
        }
    }

    /// Trims every string; blank optionals become `None`.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            referral_source: clean_optional(self.referral_source),
            referral_out: clean_optional(self.referral_out),
            insurance_company: clean_optional(self.insurance_company),
            referral_sent_to: clean_optional(self.referral_sent_to),
            outreach_rep: clean_optional(self.outreach_rep),
            notes: clean_optional(self.notes),
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let rep = self
            .outreach_rep
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty());
        check_referral_fields(
            &self.first_name,
            &self.last_name,
            self.lead_source,
            rep,
            [
                ("referral_source", self.referral_source.as_deref()),
                ("referral_out", self.referral_out.as_deref()),
                ("insurance_company", self.insurance_company.as_deref()),
                ("referral_sent_to", self.referral_sent_to.as_deref()),
            ],
            self.notes.as_deref(),
        )
        .into_result()
    }

    /// Normalises, validates and stamps the draft into a stored record.
    pub fn into_referral(
        self,
        id: RecordId,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Referral, ValidationError> {
        let draft = self.normalized();
        draft.validate()?;
        let lead_source = draft
            .lead_source
            .ok_or_else(|| ValidationError::single("lead_source", "is required"))?;
        Ok(Referral {
            id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            lead_source,
            referral_source: draft.referral_source,
            referral_out: draft.referral_out,
            insurance_company: draft.insurance_company,
            program: draft.program,
            referral_sent_to: draft.referral_sent_to,
            admitted: draft.admitted,
            outreach_rep: draft.outreach_rep,
            notes: draft.notes,
            created_at: draft.created_at.unwrap_or(now),
            created_by: actor.to_string(),
            updated_at: None,
            updated_by: None,
        })
    }
}

/// Replacement values for an existing referral. `None` keeps the current value;
/// an empty string clears an optional text field. `program` is
/// `Some(None)` when the request clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferralPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub lead_source: Option<LeadSource>,
    pub referral_source: Option<String>,
    pub referral_out: Option<String>,
    pub insurance_company: Option<String>,
    #[serde(
        deserialize_with = "blank_as_cleared::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub program: Option<Option<LevelOfCare>>,
    pub referral_sent_to: Option<String>,
    pub admitted: Option<bool>,
    pub outreach_rep: Option<String>,
    pub notes: Option<String>,
}

impl ReferralPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Merges the patch over `current` and validates the merged record.
    pub fn apply(&self, current: &Referral) -> Result<Referral, ValidationError> {
        let mut merged = current.clone();

        if let Some(v) = &self.first_name {
            merged.first_name = v.trim().to_string();
        }
        if let Some(v) = &self.last_name {
            merged.last_name = v.trim().to_string();
        }
        if let Some(v) = self.lead_source {
            merged.lead_source = v;
        }
        replace_optional(&mut merged.referral_source, &self.referral_source);
        replace_optional(&mut merged.referral_out, &self.referral_out);
        replace_optional(&mut merged.insurance_company, &self.insurance_company);
        replace_optional(&mut merged.referral_sent_to, &self.referral_sent_to);
        replace_optional(&mut merged.outreach_rep, &self.outreach_rep);
        replace_optional(&mut merged.notes, &self.notes);
        if let Some(v) = &self.admitted {
            merged.admitted = *v;
        }
        if let Some(program) = self.program {
            merged.program = program;
        }

        merged.validate()?;
        Ok(merged)
    }
}

fn replace_optional(slot: &mut Option<String>, patch: &Option<String>) {
    if let Some(v) = patch {
        *slot = clean_optional(Some(v.clone()));
    }
}

fn check_referral_fields(
    first_name: &str,
    last_name: &str,
    lead_source: Option<LeadSource>,
    outreach_rep: Option<&str>,
    text_fields: [(&str, Option<&str>); 4],
    notes: Option<&str>,
) -> ValidationError {
    let mut issues = ValidationError::default();
    check_required(&mut issues, "first_name", first_name, NAME_MAX_LEN);
    check_required(&mut issues, "last_name", last_name, NAME_MAX_LEN);
    match lead_source {
        None => issues.push("lead_source", "is required"),
        Some(LeadSource::Outreach) if outreach_rep.map_or(true, |v| v.trim().is_empty()) => {
            issues.push(
                "outreach_rep",
                "is required when lead_source is Outreach",
            );
        }
        Some(_) => {}
    }
    check_optional(&mut issues, "outreach_rep", outreach_rep, NAME_MAX_LEN);
    for (field, value) in text_fields {
        check_optional(&mut issues, field, value, TEXT_MAX_LEN);
    }
    check_optional(&mut issues, "notes", notes, NOTES_MAX_LEN);
    issues
}
