// SPDX-License-Identifier: Apache-2.0

use chrono::{Datelike, NaiveDate};
use std::ops::RangeInclusive;

/// Years a stored date may carry. Keeps RFC 3339 text fixed width.
pub const YEAR_RANGE: RangeInclusive<i32> = 1000..=9999;

/// Parses a strict `YYYY-MM-DD` day. chrono's `%Y` also takes short and
/// signed years, so the year part is checked first.
#[must_use]
pub fn parse_iso_day(raw: &str) -> Option<NaiveDate> {
    let year = raw.split('-').next()?;
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .filter(|d| YEAR_RANGE.contains(&d.year()))
}
