// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, SecondsFormat, Utc};
use unicode_normalization::UnicodeNormalization;

/// Lookup key for case-insensitive matching: NFKC, trimmed, Unicode lowercase.
#[must_use]
pub fn normalize_lookup(input: &str) -> String {
    input.trim().nfkc().collect::<String>().to_lowercase()
}

/// Escapes `input` for `LIKE ... ESCAPE '!'`.
#[must_use]
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '!' | '%' | '_' => {
                out.push('!');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn lookup_folds_width_and_case() {
        assert_eq!(normalize_lookup("  ＡＥＴＮＡ Health "), "aetna health");
    }

    #[test]
    fn like_escape_marks_wildcards() {
        assert_eq!(escape_like("50%_off!"), "50!%!_off!!");
    }

    #[test]
    fn timestamps_are_fixed_width() {
        let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("time");
        let b = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).single().expect("time");
        let (fa, fb) = (format_timestamp(a), format_timestamp(b));
        assert_eq!(fa.len(), fb.len());
        assert!(fa < fb);
        assert_eq!(parse_timestamp(&fa).expect("parse"), a);
    }
}
