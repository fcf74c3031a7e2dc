// SPDX-License-Identifier: Apache-2.0

use crate::{CliError, OutputMode};
use chrono::Utc;
use referral_desk_ingest::{import_referrals, write_metrics_csv, write_referrals_csv, ImportOptions};
use referral_desk_query::{
    select_referrals, sort_groups, summarize, GroupBy, GroupColumn, GroupStats, MetricsFilter,
    QueryError, QueryErrorCode, ReferralFilter, SortDirection, SortKey,
};
use referral_desk_store::{ContactFilter, ReferralStore, StoreError};
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub(crate) struct MetricsArgs {
    pub(crate) filter: MetricsFilter,
    pub(crate) group_by: Option<GroupBy>,
    pub(crate) sort: GroupColumn,
    pub(crate) direction: SortDirection,
    pub(crate) out: Option<PathBuf>,
}

fn emit(output: OutputMode, payload: &Value, text: impl FnOnce() -> String) -> Result<(), CliError> {
    if output.json {
        println!(
            "{}",
            serde_json::to_string(payload).map_err(|e| CliError::internal(e.to_string()))?
        );
    } else if !output.quiet {
        println!("{}", text());
    }
    Ok(())
}

fn open_store(db: &Path) -> Result<ReferralStore, CliError> {
    ReferralStore::open(db)
        .map_err(|e| CliError::dependency(format!("open database {}: {}", db.display(), e.message)))
}

fn open_existing_store(db: &Path) -> Result<ReferralStore, CliError> {
    if !db.is_file() {
        return Err(CliError::dependency(format!(
            "database not found: {}",
            db.display()
        )));
    }
    open_store(db)
}

/// Dry runs never write, so a missing database stays missing.
fn open_for_dry_run(db: &Path) -> Result<ReferralStore, CliError> {
    if db.is_file() {
        return open_store(db);
    }
    ReferralStore::open_in_memory()
        .map_err(|e| CliError::internal(format!("open scratch database: {}", e.message)))
}

fn store_error(err: StoreError) -> CliError {
    CliError::internal(err.to_string())
}

fn query_error(err: QueryError) -> CliError {
    match err.code {
        QueryErrorCode::Validation | QueryErrorCode::Cursor => CliError::validation(err.message),
        _ => CliError::internal(err.message),
    }
}

fn create_output(path: &Path) -> Result<BufWriter<File>, CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| CliError::dependency(format!("create {}: {e}", parent.display())))?;
    }
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| CliError::dependency(format!("create {}: {e}", path.display())))
}

pub(crate) fn init_db(db: &Path, output: OutputMode) -> Result<(), CliError> {
    let store = open_store(db)?;
    let schema_version = store.schema_version().map_err(store_error)?;
    tracing::info!(db = %db.display(), schema_version, "database ready");
    emit(
        output,
        &json!({"db": db.display().to_string(), "schema_version": schema_version}),
        || format!("db={}\nschema_version={schema_version}", db.display()),
    )
}

pub(crate) fn import(
    db: &Path,
    csv_path: &Path,
    options: ImportOptions,
    output: OutputMode,
) -> Result<(), CliError> {
    options
        .validate()
        .map_err(|e| CliError::validation(e.to_string()))?;
    let file = File::open(csv_path)
        .map_err(|e| CliError::dependency(format!("open {}: {e}", csv_path.display())))?;
    let mut store = if options.dry_run {
        open_for_dry_run(db)?
    } else {
        open_store(db)?
    };
    let report = import_referrals(&mut store, std::io::BufReader::new(file), &options, Utc::now())
        .map_err(|e| CliError::validation(e.to_string()))?;

    let payload = serde_json::to_value(&report).map_err(|e| CliError::internal(e.to_string()))?;
    emit(output, &payload, || {
        let mut lines = vec![
            format!("rows_read={}", report.rows_read),
            format!("rows_valid={}", report.rows_valid),
            format!("written={}", report.written),
            format!("skipped_blank={}", report.skipped_blank),
            format!("dry_run={}", report.dry_run),
        ];
        if !report.unmapped_headers.is_empty() {
            lines.push(format!("unmapped_headers={}", report.unmapped_headers.join(",")));
        }
        for row in &report.row_errors {
            lines.push(format!("line {}: {}", row.line, row.messages.join("; ")));
        }
        for batch in &report.failed_batches {
            lines.push(format!(
                "batch {} ({} rows) failed: {}",
                batch.index, batch.rows, batch.error
            ));
        }
        lines.join("\n")
    })?;

    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::validation(format!(
            "{} rows rejected, {} batches failed",
            report.row_errors.len(),
            report.failed_batches.len()
        )))
    }
}

pub(crate) fn export(
    db: &Path,
    out: Option<&Path>,
    filter: &ReferralFilter,
    sort: SortKey,
    direction: SortDirection,
    output: OutputMode,
) -> Result<(), CliError> {
    let store = open_existing_store(db)?;
    let rows = select_referrals(store.connection(), filter, sort, direction).map_err(query_error)?;
    let Some(path) = out else {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        write_referrals_csv(&mut lock, &rows).map_err(|e| CliError::internal(e.to_string()))?;
        return lock.flush().map_err(|e| CliError::internal(e.to_string()));
    };

    let mut writer = create_output(path)?;
    let written =
        write_referrals_csv(&mut writer, &rows).map_err(|e| CliError::internal(e.to_string()))?;
    writer
        .flush()
        .map_err(|e| CliError::dependency(format!("write {}: {e}", path.display())))?;
    tracing::info!(rows = written, out = %path.display(), "referrals exported");
    emit(
        output,
        &json!({"out": path.display().to_string(), "rows": written}),
        || format!("exported {written} referrals to {}", path.display()),
    )
}

fn grouped(groups: &[GroupStats], sort: GroupColumn, direction: SortDirection) -> Vec<GroupStats> {
    let mut out = groups.to_vec();
    sort_groups(&mut out, sort, direction);
    out
}

pub(crate) fn metrics(db: &Path, args: &MetricsArgs, output: OutputMode) -> Result<(), CliError> {
    args.filter.validate().map_err(query_error)?;
    let store = open_existing_store(db)?;
    let records = store.all_referrals().map_err(store_error)?;
    let report = summarize(&records, &args.filter);

    if let Some(path) = &args.out {
        let by = args.group_by.unwrap_or(GroupBy::LeadSource);
        let groups = grouped(report.groups(by), args.sort, args.direction);
        let mut writer = create_output(path)?;
        write_metrics_csv(&mut writer, &groups).map_err(|e| CliError::internal(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| CliError::dependency(format!("write {}: {e}", path.display())))?;
        tracing::info!(group_by = by.as_str(), out = %path.display(), "metrics exported");
    }

    let groups = args
        .group_by
        .map(|by| grouped(report.groups(by), args.sort, args.direction));
    let payload = json!({
        "report": &report,
        "group_by": args.group_by.map(GroupBy::as_str),
        "groups": &groups,
    });
    emit(output, &payload, || {
        let overview = &report.overview;
        let mut lines = vec![format!(
            "total={} admitted={} conversion_rate={:.1}%",
            overview.total, overview.admitted, overview.conversion_rate
        )];
        for q in &report.quarters {
            lines.push(format!(
                "{} total={} admitted={} conversion_rate={:.1}%",
                q.quarter, q.total, q.admitted, q.conversion_rate
            ));
        }
        if let (Some(by), Some(groups)) = (args.group_by, &groups) {
            lines.push(format!("by {}:", by.as_str()));
            for g in groups {
                lines.push(format!(
                    "  {}\t{}\t{}\t{:.1}%",
                    g.key, g.total, g.admitted, g.conversion_rate
                ));
            }
        }
        lines.join("\n")
    })
}

pub(crate) fn inspect_db(db: &Path, output: OutputMode) -> Result<(), CliError> {
    let store = open_existing_store(db)?;
    let schema_version = store.schema_version().map_err(store_error)?;
    let referrals = store.count_referrals().map_err(store_error)?;
    let contacts = store
        .list_contacts(&ContactFilter::default())
        .map_err(store_error)?
        .len();
    let mut stmt = store
        .connection()
        .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name NOT LIKE 'sqlite_%' ORDER BY name")
        .map_err(|e| CliError::internal(e.to_string()))?;
    let indexes = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| CliError::internal(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CliError::internal(e.to_string()))?;

    emit(
        output,
        &json!({
            "db": db.display().to_string(),
            "schema_version": schema_version,
            "referrals": referrals,
            "contacts": contacts,
            "indexes": indexes,
        }),
        || {
            format!(
                "schema_version={schema_version}\nreferrals={referrals}\ncontacts={contacts}\nindexes={}",
                indexes.join(",")
            )
        },
    )
}
