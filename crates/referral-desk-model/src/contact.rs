// SPDX-License-Identifier: Apache-2.0

use crate::ids::RecordId;
use crate::validation::{check_optional, check_required, clean_optional, ValidationError, TEXT_MAX_LEN};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A referral partner contact; unrelated to referral records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferentContact {
    pub id: RecordId,
    pub referral_partner: String,
    pub referral_rep: String,
    pub referral_contact_info: String,
    pub referent_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl ReferentContact {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_contact_fields(
            &self.referral_partner,
            &self.referral_rep,
            &self.referral_contact_info,
            self.referent_email.as_deref(),
        )
        .into_result()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContactDraft {
    pub referral_partner: String,
    pub referral_rep: String,
    pub referral_contact_info: String,
    pub referent_email: Option<String>,
}

impl ContactDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let email = clean_optional(self.referent_email.clone());
        check_contact_fields(
            &self.referral_partner,
            &self.referral_rep,
            &self.referral_contact_info,
            email.as_deref(),
        )
        .into_result()
    }

    pub fn into_contact(
        self,
        id: RecordId,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<ReferentContact, ValidationError> {
        self.validate()?;
        Ok(ReferentContact {
            id,
            referral_partner: self.referral_partner.trim().to_string(),
            referral_rep: self.referral_rep.trim().to_string(),
            referral_contact_info: self.referral_contact_info.trim().to_string(),
            referent_email: clean_optional(self.referent_email),
            created_at: now,
            created_by: actor.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContactPatch {
    pub referral_partner: Option<String>,
    pub referral_rep: Option<String>,
    pub referral_contact_info: Option<String>,
    pub referent_email: Option<String>,
}

impl ContactPatch {
    pub fn apply(&self, current: &ReferentContact) -> Result<ReferentContact, ValidationError> {
        let mut merged = current.clone();
        if let Some(v) = &self.referral_partner {
            merged.referral_partner = v.trim().to_string();
        }
        if let Some(v) = &self.referral_rep {
            merged.referral_rep = v.trim().to_string();
        }
        if let Some(v) = &self.referral_contact_info {
            merged.referral_contact_info = v.trim().to_string();
        }
        if let Some(v) = &self.referent_email {
            merged.referent_email = clean_optional(Some(v.clone()));
        }
        merged.validate()?;
        Ok(merged)
    }
}

fn check_contact_fields(
    partner: &str,
    rep: &str,
    contact_info: &str,
    email: Option<&str>,
) -> ValidationError {
    let mut issues = ValidationError::default();
    check_required(&mut issues, "referral_partner", partner, TEXT_MAX_LEN);
    check_required(&mut issues, "referral_rep", rep, TEXT_MAX_LEN);
    check_required(&mut issues, "referral_contact_info", contact_info, TEXT_MAX_LEN);
    check_optional(&mut issues, "referent_email", email, TEXT_MAX_LEN);
    if let Some(e) = email {
        if !e.contains('@') {
            issues.push("referent_email", "must contain '@'");
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft() -> ContactDraft {
        ContactDraft {
            referral_partner: "Harbor Clinic".into(),
            referral_rep: "Lee".into(),
            referral_contact_info: "555-0100".into(),
            referent_email: Some(" lee@harbor.example ".into()),
        }
    }

    #[test]
    fn draft_requires_partner_rep_and_contact_info() {
        let err = ContactDraft::default().validate().expect_err("empty");
        assert_eq!(err.issues.len(), 3);
    }

    #[test]
    fn email_must_contain_at_sign() {
        let bad = ContactDraft {
            referent_email: Some("lee.harbor.example".into()),
            ..draft()
        };
        assert!(bad.validate().expect_err("email").has_field("referent_email"));
        let blank = ContactDraft {
            referent_email: Some("  ".into()),
            ..draft()
        };
        assert!(blank.validate().is_ok());
    }

    #[test]
    fn patch_merges_and_clears_email() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single().expect("time");
        let contact = draft()
            .into_contact(RecordId::generate(), "admin", now)
            .expect("valid");
        assert_eq!(contact.referent_email.as_deref(), Some("lee@harbor.example"));

        let patched = ContactPatch {
            referral_rep: Some("Kim".into()),
            referent_email: Some(String::new()),
            ..ContactPatch::default()
        }
        .apply(&contact)
        .expect("patch");
        assert_eq!(patched.referral_rep, "Kim");
        assert_eq!(patched.referent_email, None);

        let err = ContactPatch {
            referral_partner: Some(" ".into()),
            ..ContactPatch::default()
        }
        .apply(&contact)
        .expect_err("partner required");
        assert!(err.has_field("referral_partner"));
    }
}
