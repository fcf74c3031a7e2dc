// SPDX-License-Identifier: Apache-2.0

use crate::cells::{parse_bool, parse_date};
use crate::headers::{HeaderMap, ReferralColumn};
use crate::logging::{fields, ImportLog, ImportStage};
use crate::{ImportOptions, ImportReport, IngestError, RowError};
use chrono::{DateTime, Utc};
use referral_desk_model::{LeadSource, LevelOfCare, RecordId, Referral, ReferralDraft};
use referral_desk_store::ReferralStore;
use std::io::Read;

/// Rows accepted and rejected by a parse pass, before anything is written.
#[derive(Debug, Clone, Default)]
pub struct ParsedImport {
    pub rows: Vec<Referral>,
    pub rows_read: usize,
    pub skipped_blank: usize,
    pub row_errors: Vec<RowError>,
    pub unmapped_headers: Vec<String>,
}

fn cell<'r>(record: &'r csv::StringRecord, map: &HeaderMap, column: ReferralColumn) -> Option<&'r str> {
    map.position(column)
        .and_then(|idx| record.get(idx))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

fn split_full_name(full: &str) -> (String, String) {
    match full.trim().split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (full.trim().to_string(), String::new()),
    }
}

fn row_to_referral(
    record: &csv::StringRecord,
    map: &HeaderMap,
    options: &ImportOptions,
    now: DateTime<Utc>,
) -> Result<Referral, Vec<String>> {
    let mut problems: Vec<String> = Vec::new();

    let (mut first_name, mut last_name) = (
        cell(record, map, ReferralColumn::FirstName).unwrap_or_default().to_string(),
        cell(record, map, ReferralColumn::LastName).unwrap_or_default().to_string(),
    );
    if first_name.is_empty() && last_name.is_empty() {
        if let Some(full) = cell(record, map, ReferralColumn::FullName) {
            (first_name, last_name) = split_full_name(full);
        }
    }

    let mut lead_cell_invalid = false;
    let lead_source = match cell(record, map, ReferralColumn::LeadSource) {
        Some(raw) => match LeadSource::parse(raw) {
            Ok(v) => Some(v),
            Err(err) => {
                problems.push(err.to_string());
                lead_cell_invalid = true;
                None
            }
        },
        None => options.default_lead_source,
    };
    let program = match cell(record, map, ReferralColumn::Program) {
        Some(raw) => match LevelOfCare::parse(raw) {
            Ok(v) => Some(v),
            Err(err) => {
                problems.push(err.to_string());
                None
            }
        },
        None => None,
    };
    let admitted = match parse_bool(cell(record, map, ReferralColumn::Admitted).unwrap_or_default()) {
        Ok(v) => v,
        Err(err) => {
            problems.push(format!("admitted: {err}"));
            false
        }
    };
    let created_at = match cell(record, map, ReferralColumn::CreatedAt) {
        Some(raw) => match parse_date(raw) {
            Ok(ts) => Some(ts),
            Err(err) => {
                problems.push(format!("created_at: {err}"));
                None
            }
        },
        None => None,
    };

    let draft = ReferralDraft {
        first_name,
        last_name,
        lead_source,
        referral_source: owned(cell(record, map, ReferralColumn::ReferralSource)),
        referral_out: owned(cell(record, map, ReferralColumn::ReferralOut)),
        insurance_company: owned(cell(record, map, ReferralColumn::InsuranceCompany)),
        program,
        referral_sent_to: owned(cell(record, map, ReferralColumn::ReferralSentTo)),
        admitted,
        outreach_rep: owned(cell(record, map, ReferralColumn::OutreachRep)),
        notes: owned(cell(record, map, ReferralColumn::Notes)),
        created_at,
    };
    let actor = cell(record, map, ReferralColumn::CreatedBy).unwrap_or(options.actor.as_str());

    match draft.into_referral(RecordId::generate(), actor, now) {
        Ok(referral) if problems.is_empty() => Ok(referral),
        Ok(_) => Err(problems),
        Err(err) => {
            for issue in err.issues {
                // An unreadable lead source cell is already reported above.
                if issue.field == "lead_source" && lead_cell_invalid {
                    continue;
                }
                problems.push(format!("{}: {}", issue.field, issue.reason));
            }
            Err(problems)
        }
    }
}

/// Reads and validates every row without touching the store.
pub fn parse_referrals<R: Read>(
    reader: R,
    options: &ImportOptions,
    now: DateTime<Utc>,
    log: &mut ImportLog,
) -> Result<ParsedImport, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|e| IngestError(format!("failed reading CSV header row: {e}")))?
        .clone();
    let map = HeaderMap::from_headers(headers.iter())?;
    log.emit(
        ImportStage::Headers,
        "headers_mapped",
        fields([
            ("columns", headers.len().to_string()),
            ("unmapped", map.unmapped.join("|")),
        ]),
    );

    let mut parsed = ParsedImport {
        unmapped_headers: map.unmapped.clone(),
        ..ParsedImport::default()
    };
    for (idx, result) in csv_reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map_or(idx + 2, |p| p.line() as usize);
                parsed.rows_read += 1;
                parsed.row_errors.push(RowError {
                    line,
                    messages: vec![format!("unreadable row: {e}")],
                });
                continue;
            }
        };
        let line = record.position().map_or(idx + 2, |p| p.line() as usize);
        if record.iter().all(|c| c.trim().is_empty()) {
            parsed.skipped_blank += 1;
            continue;
        }
        parsed.rows_read += 1;
        match row_to_referral(&record, &map, options, now) {
            Ok(referral) => parsed.rows.push(referral),
            Err(messages) => parsed.row_errors.push(RowError { line, messages }),
        }
    }
    log.emit(
        ImportStage::Parse,
        "rows_parsed",
        fields([
            ("rows_read", parsed.rows_read.to_string()),
            ("valid", parsed.rows.len().to_string()),
            ("rejected", parsed.row_errors.len().to_string()),
            ("skipped_blank", parsed.skipped_blank.to_string()),
        ]),
    );
    Ok(parsed)
}

/// Parses `reader` and writes the valid rows through batched transactions.
pub fn import_referrals<R: Read>(
    store: &mut ReferralStore,
    reader: R,
    options: &ImportOptions,
    now: DateTime<Utc>,
) -> Result<ImportReport, IngestError> {
    options.validate()?;
    let mut log = ImportLog::default();
    let parsed = parse_referrals(reader, options, now, &mut log)?;
    let rows_valid = parsed.rows.len();

    let (written, failed_batches, batch_size) = if options.dry_run || parsed.rows.is_empty() {
        (0, Vec::new(), options.batch_size)
    } else {
        let outcome = store
            .insert_referrals_batched(parsed.rows, options.batch_size)
            .map_err(|e| IngestError(e.to_string()))?;
        let failed = outcome
            .failed_batches()
            .map(|b| crate::FailedBatch {
                index: b.index,
                rows: b.rows,
                error: b.error.clone().unwrap_or_default(),
            })
            .collect::<Vec<_>>();
        (outcome.written, failed, outcome.batch_size)
    };
    log.emit(
        ImportStage::Persist,
        "rows_written",
        fields([
            ("written", written.to_string()),
            ("failed_batches", failed_batches.len().to_string()),
            ("batch_size", batch_size.to_string()),
            ("dry_run", options.dry_run.to_string()),
        ]),
    );
    log.emit(
        ImportStage::Finalize,
        "import_finished",
        fields([("actor", options.actor.clone())]),
    );

    Ok(ImportReport {
        rows_read: parsed.rows_read,
        rows_valid,
        written,
        skipped_blank: parsed.skipped_blank,
        row_errors: parsed.row_errors,
        unmapped_headers: parsed.unmapped_headers,
        failed_batches,
        dry_run: options.dry_run,
        events: log.into_events(),
    })
}
