// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod cells;
mod export;
mod headers;
mod import;
mod logging;

use referral_desk_model::{LeadSource, UNKNOWN_ACTOR};
use referral_desk_store::MAX_BATCH_SIZE;
use serde::Serialize;
use std::fmt::{Display, Formatter};

pub const CRATE_NAME: &str = "referral-desk-ingest";

pub use cells::{parse_bool, parse_date};
pub use export::{write_metrics_csv, write_referrals_csv, METRICS_CSV_HEADER, REFERRAL_CSV_HEADER};
pub use headers::{lookup_column, normalize_header, HeaderMap, ReferralColumn};
pub use import::{import_referrals, parse_referrals, ParsedImport};
pub use logging::{ImportEvent, ImportLog, ImportStage};

#[derive(Debug)]
pub struct IngestError(pub String);
impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for IngestError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Rows per write transaction; values above [`MAX_BATCH_SIZE`] are capped.
    pub batch_size: usize,
    /// Used for rows whose lead source cell is empty or missing.
    pub default_lead_source: Option<LeadSource>,
    pub actor: String,
    pub dry_run: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            default_lead_source: None,
            actor: UNKNOWN_ACTOR.to_string(),
            dry_run: false,
        }
    }
}

impl ImportOptions {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.batch_size == 0 {
            return Err(IngestError("batch_size must be at least 1".to_string()));
        }
        if self.actor.trim().is_empty() {
            return Err(IngestError("actor must not be blank".to_string()));
        }
        Ok(())
    }
}

/// Rejected CSV row; `line` is the 1-based line in the source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub line: usize,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedBatch {
    pub index: usize,
    pub rows: usize,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub rows_read: usize,
    pub rows_valid: usize,
    pub written: usize,
    pub skipped_blank: usize,
    pub row_errors: Vec<RowError>,
    pub unmapped_headers: Vec<String>,
    pub failed_batches: Vec<FailedBatch>,
    pub dry_run: bool,
    pub events: Vec<ImportEvent>,
}

impl ImportReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.row_errors.is_empty() && self.failed_batches.is_empty()
    }
}
