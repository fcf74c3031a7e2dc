// SPDX-License-Identifier: Apache-2.0

use crate::cursor::{
    decode_cursor, encode_cursor, CursorPayload, PageDirection, CURSOR_VERSION_V1,
};
use crate::filters::{ReferralFilter, SortDirection, SortKey};
use crate::limits::QueryLimits;
use crate::query_error::{QueryError, QueryErrorCode};
use referral_desk_core::canonical;
use referral_desk_model::Referral;
use referral_desk_store::{format_timestamp, normalize_lookup, referral_from_row, REFERRAL_COLUMNS};
use rusqlite::{params_from_iter, types::Value, Connection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferralListRequest {
    pub filter: ReferralFilter,
    pub sort: SortKey,
    pub direction: SortDirection,
    pub limit: usize,
    pub cursor: Option<String>,
}

impl Default for ReferralListRequest {
    fn default() -> Self {
        Self {
            filter: ReferralFilter::default(),
            sort: SortKey::Date,
            direction: SortDirection::Desc,
            limit: QueryLimits::default().default_limit,
            cursor: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReferralPage {
    pub rows: Vec<Referral>,
    pub total_count: u64,
    pub next_cursor: Option<String>,
    pub prev_cursor: Option<String>,
}

/// Hash of everything that shapes a page except the cursor itself.
pub fn request_hash(req: &ReferralListRequest) -> Result<String, QueryError> {
    let mut no_cursor = req.clone();
    no_cursor.cursor = None;
    canonical::stable_json_hash_hex(&no_cursor)
        .map_err(|e| QueryError::new(QueryErrorCode::Validation, e.to_string()))
}

fn sort_value(sort: SortKey, row: &Referral) -> String {
    match sort {
        SortKey::Date => format_timestamp(row.created_at),
        SortKey::Name => normalize_lookup(&row.full_name()),
    }
}

fn build_where(filter: &ReferralFilter) -> (Vec<String>, Vec<Value>) {
    let mut where_parts = Vec::new();
    let mut params = Vec::new();
    filter.push_sql(&mut where_parts, &mut params);
    (where_parts, params)
}

fn where_clause(where_parts: &[String]) -> String {
    if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    }
}

fn order_clause(sort: SortKey, direction: SortDirection) -> String {
    let dir = match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    format!(" ORDER BY {} {dir}, id {dir}", sort.column())
}

fn collect_rows(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> Result<Vec<Referral>, QueryError> {
    let mut stmt = conn.prepare(sql)?;
    let mapped = stmt.query_map(params_from_iter(params.iter()), referral_from_row)?;
    Ok(mapped.collect::<Result<Vec<_>, _>>()?)
}

pub fn count_referrals(conn: &Connection, filter: &ReferralFilter) -> Result<u64, QueryError> {
    let (where_parts, params) = build_where(filter);
    let sql = format!("SELECT COUNT(*) FROM referrals{}", where_clause(&where_parts));
    let n: i64 = conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
    Ok(u64::try_from(n).unwrap_or(0))
}

/// Every referral matching `filter`, in the requested order, without paging.
pub fn select_referrals(
    conn: &Connection,
    filter: &ReferralFilter,
    sort: SortKey,
    direction: SortDirection,
) -> Result<Vec<Referral>, QueryError> {
    filter.validate(&QueryLimits::default())?;
    let (where_parts, params) = build_where(filter);
    let sql = format!(
        "SELECT {REFERRAL_COLUMNS} FROM referrals{}{}",
        where_clause(&where_parts),
        order_clause(sort, direction)
    );
    collect_rows(conn, &sql, &params)
}

fn validate_request(req: &ReferralListRequest, limits: &QueryLimits) -> Result<(), QueryError> {
    if req.limit == 0 || req.limit > limits.max_limit {
        return Err(QueryError::validation(format!(
            "limit must be between 1 and {}",
            limits.max_limit
        )));
    }
    req.filter.validate(limits)
}

/// One page of the admin table. Cursors continue in either direction from the
/// page they were issued on.
pub fn list_referrals(
    conn: &Connection,
    req: &ReferralListRequest,
    limits: &QueryLimits,
    cursor_secret: &[u8],
) -> Result<ReferralPage, QueryError> {
    validate_request(req, limits)?;
    let query_hash = request_hash(req)?;
    let decoded = req
        .cursor
        .as_deref()
        .map(|token| decode_cursor(token, cursor_secret, &query_hash, req.sort.as_str()))
        .transpose()?;

    let (mut where_parts, mut params) = build_where(&req.filter);
    let total_count = count_referrals(conn, &req.filter)?;

    let page = decoded.as_ref().map_or(PageDirection::Next, |c| c.page);
    // A previous page is read in reverse order and flipped back afterwards.
    let scan_direction = match page {
        PageDirection::Next => req.direction,
        PageDirection::Prev => req.direction.reverse(),
    };
    if let Some(cursor) = &decoded {
        let op = match scan_direction {
            SortDirection::Asc => ">",
            SortDirection::Desc => "<",
        };
        let column = req.sort.column();
        where_parts.push(format!(
            "({column} {op} ? OR ({column} = ? AND id {op} ?))"
        ));
        params.push(Value::Text(cursor.last_key.clone()));
        params.push(Value::Text(cursor.last_key.clone()));
        params.push(Value::Text(cursor.last_id.clone()));
    }
    let sql = format!(
        "SELECT {REFERRAL_COLUMNS} FROM referrals{}{} LIMIT ?",
        where_clause(&where_parts),
        order_clause(req.sort, scan_direction)
    );
    let fetch = i64::try_from(req.limit + 1)
        .map_err(|_| QueryError::validation("limit out of range"))?;
    params.push(Value::Integer(fetch));

    let mut rows = collect_rows(conn, &sql, &params)?;
    let has_more = rows.len() > req.limit;
    if has_more {
        rows.truncate(req.limit);
    }
    if page == PageDirection::Prev {
        rows.reverse();
    }

    let (more_after, more_before) = match (page, decoded.is_some()) {
        (PageDirection::Next, from_cursor) => (has_more, from_cursor),
        (PageDirection::Prev, _) => (true, has_more),
    };
    let depth = decoded.as_ref().map_or(0, |c| c.depth);

    let make_cursor = |row: &Referral, page: PageDirection, depth: u32| {
        encode_cursor(
            &CursorPayload {
                cursor_version: CURSOR_VERSION_V1.to_string(),
                sort: req.sort.as_str().to_string(),
                page,
                last_key: sort_value(req.sort, row),
                last_id: row.id.as_str().to_string(),
                query_hash: query_hash.clone(),
                depth,
            },
            cursor_secret,
        )
    };

    let next_cursor = match rows.last() {
        Some(last) if more_after => Some(make_cursor(
            last,
            PageDirection::Next,
            depth.saturating_add(1),
        )?),
        _ => None,
    };
    let prev_cursor = match rows.first() {
        Some(first) if more_before => Some(make_cursor(
            first,
            PageDirection::Prev,
            depth.saturating_sub(1),
        )?),
        _ => None,
    };

    tracing::debug!(
        total_count,
        returned = rows.len(),
        sort = req.sort.as_str(),
        direction = req.direction.as_str(),
        "referral page served"
    );
    Ok(ReferralPage {
        rows,
        total_count,
        next_cursor,
        prev_cursor,
    })
}
