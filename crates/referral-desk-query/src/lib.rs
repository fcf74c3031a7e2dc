// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod cursor;
mod filters;
mod limits;
mod list;
mod metrics;
mod query_error;

pub use cursor::{
    decode_cursor, encode_cursor, CursorError, CursorErrorCode, CursorPayload, PageDirection,
};
pub use filters::{ReferralFilter, SortDirection, SortKey};
pub use limits::QueryLimits;
pub use list::{
    count_referrals, list_referrals, request_hash, select_referrals, ReferralListRequest,
    ReferralPage,
};
pub use metrics::{
    conversion_rate, sort_groups, summarize, CountStats, GroupBy, GroupColumn, GroupStats,
    MetricsFilter, MetricsReport, Overview, QuarterStats, UNKNOWN_GROUP,
};
pub use query_error::{QueryError, QueryErrorCode};

pub const CRATE_NAME: &str = "referral-desk-query";
