//! French date normalization.
//!
//! Listing pages show dates such as `16 juillet 2025`. [`normalize_date`]
//! turns them into `YYYY-MM-DD`; anything it cannot read is returned verbatim
//! so a raw date is never lost.

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Month names as printed on the site, with their two-digit codes.
const MONTHS: [(&str, &str); 12] = [
    ("janvier", "01"),
    ("février", "02"),
    ("mars", "03"),
    ("avril", "04"),
    ("mai", "05"),
    ("juin", "06"),
    ("juillet", "07"),
    ("août", "08"),
    ("septembre", "09"),
    ("octobre", "10"),
    ("novembre", "11"),
    ("décembre", "12"),
];

static DAY_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\s+(\w+)\s+(\d{4})").unwrap());

fn month_code(name: &str) -> Option<&'static str> {
    MONTHS
        .iter()
        .find(|(month, _)| *month == name)
        .map(|(_, code)| *code)
}

/// Normalize a `<day> <month> <year>` date to `YYYY-MM-DD`.
///
/// Matching is case-insensitive and the pattern may appear anywhere in the
/// text. When it does not match, or the month is unknown, the input is
/// returned unchanged.
pub fn normalize_date(text: &str) -> String {
    let lowered = text.to_lowercase();
    DAY_MONTH_YEAR
        .captures(&lowered)
        .and_then(|caps| {
            let code = month_code(&caps[2])?;
            Some(format!("{}-{}-{:0>2}", &caps[3], code, &caps[1]))
        })
        .unwrap_or_else(|| text.to_string())
}

/// [`normalize_date`] lifted over an optional input.
pub fn normalize_optional(text: Option<&str>) -> Option<String> {
    text.map(normalize_date)
}

/// Read a machine-readable `datetime` attribute into `YYYY-MM-DD`.
///
/// Accepts RFC 3339 timestamps and bare ISO dates.
pub fn parse_datetime_attr(value: &str) -> Option<String> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}
