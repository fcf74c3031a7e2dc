// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const NAME_MAX_LEN: usize = 256;
pub const TEXT_MAX_LEN: usize = 512;
pub const NOTES_MAX_LEN: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub reason: String,
}

/// Every failing field of a record, in check order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    #[must_use]
    pub fn single(field: &str, reason: &str) -> Self {
        let mut out = Self::default();
        out.push(field, reason);
        out
    }

    pub fn push(&mut self, field: &str, reason: &str) {
        self.issues.push(FieldIssue {
            field: field.to_string(),
            reason: reason.to_string(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }

    pub(crate) fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .issues
            .iter()
            .map(|issue| format!("{}: {}", issue.field, issue.reason))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Trims an optional string; blank becomes `None`.
#[must_use]
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == raw.len() {
            Some(raw)
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub(crate) fn check_required(
    issues: &mut ValidationError,
    field: &str,
    value: &str,
    max_len: usize,
) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        issues.push(field, "is required");
    } else if trimmed.chars().count() > max_len {
        issues.push(field, &format!("exceeds max length {max_len}"));
    }
}

pub(crate) fn check_optional(
    issues: &mut ValidationError,
    field: &str,
    value: Option<&str>,
    max_len: usize,
) {
    if let Some(v) = value {
        if v.chars().count() > max_len {
            issues.push(field, &format!("exceeds max length {max_len}"));
        }
    }
}
