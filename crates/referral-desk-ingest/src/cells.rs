// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use referral_desk_model::{parse_iso_day, YEAR_RANGE};

pub fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" | "admitted" | "x" => Ok(true),
        "no" | "n" | "false" | "0" | "" => Ok(false),
        other => Err(format!("cannot read '{other}' as yes/no")),
    }
}

/// Accepts `YYYY-MM-DD`, `MM/DD/YYYY` (midnight UTC) or RFC 3339.
///
/// Years are four unsigned digits between 1000 and 9999, so `3/7/24` is
/// rejected rather than read as year 24.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        let ts = ts.with_timezone(&Utc);
        if YEAR_RANGE.contains(&ts.year()) {
            return Ok(ts);
        }
        return Err(format!("'{trimmed}' is outside years 1000 to 9999"));
    }
    parse_iso_day(trimmed)
        .or_else(|| parse_us_day(trimmed))
        .map(|day| day.and_time(NaiveTime::MIN).and_utc())
        .ok_or_else(|| {
            format!("cannot read '{trimmed}' as a date (YYYY-MM-DD, MM/DD/YYYY or RFC 3339)")
        })
}

fn parse_us_day(raw: &str) -> Option<NaiveDate> {
    let (_, year) = raw.rsplit_once('/')?;
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%m/%d/%Y")
        .ok()
        .filter(|d| YEAR_RANGE.contains(&d.year()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn booleans() {
        for t in ["Yes", "y", "TRUE", "1", "Admitted", "x"] {
            assert_eq!(parse_bool(t), Ok(true), "{t}");
        }
        for f in ["no", "N", "false", "0", "", "  "] {
            assert_eq!(parse_bool(f), Ok(false), "{f}");
        }
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn dates() {
        let day = Utc.with_ymd_and_hms(2024, 3, 7, 0, 0, 0).single().expect("time");
        assert_eq!(parse_date("2024-03-07"), Ok(day));
        assert_eq!(parse_date("03/07/2024"), Ok(day));
        assert_eq!(parse_date("3/7/2024"), Ok(day));
        assert_eq!(
            parse_date("2024-03-07T05:00:00-05:00"),
            Ok(Utc.with_ymd_and_hms(2024, 3, 7, 10, 0, 0).single().expect("time"))
        );
        assert!(parse_date("07.03.2024").is_err());
    }

    #[test]
    fn short_or_signed_years_are_rejected() {
        for raw in ["3/7/24", "24-03-07", "-0001-01-01", "+10000-01-01", "3/7/02024"] {
            assert!(parse_date(raw).is_err(), "{raw} must not parse");
        }
        assert!(parse_date("0999-01-02").is_err());
        assert!(parse_date("1000-01-01T00:30:00+01:00").is_err());
    }
}
