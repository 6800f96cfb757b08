//! Time scales used across the pass generator
//!
//! Every internal time is seconds since 1985-01-01T00:00:00 UTC ("sec85").
//! Granules carry seconds since 2000-01-01; selection bounds arrive as
//! calendar dates, Modified Julian Days or raw sec85 values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Unix timestamp of 1985-01-01T00:00:00Z
pub const UNIX_AT_1985: i64 = 473_385_600;

/// sec85 value of 2000-01-01T00:00:00Z, the granule time origin
pub const SEC85_AT_2000: f64 = 473_299_200.0;

/// Modified Julian Day of 1985-01-01
pub const MJD_AT_1985: f64 = 46_066.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

pub fn from_datetime(dt: &DateTime<Utc>) -> f64 {
    (dt.timestamp() - UNIX_AT_1985) as f64 + f64::from(dt.timestamp_subsec_nanos()) * 1e-9
}

pub fn to_datetime(sec85: f64) -> Option<DateTime<Utc>> {
    if !sec85.is_finite() {
        return None;
    }
    let whole = sec85.floor();
    let nanos = ((sec85 - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64 + UNIX_AT_1985, nanos)
}

pub fn from_mjd(mjd: f64) -> f64 {
    (mjd - MJD_AT_1985) * SECONDS_PER_DAY
}

/// Parse an ISO-like calendar date: `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[.fff]`
/// or the same with a space separator.
pub fn parse_calendar(text: &str) -> Option<f64> {
    let text = text.trim().trim_end_matches('Z');
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(from_datetime(&naive.and_utc()));
        }
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    Some(from_datetime(&date.and_hms_opt(0, 0, 0)?.and_utc()))
}

/// Parse a compact `YYYYMMDD` or `YYYYMMDDHHMMSS` date.
pub fn parse_ymd(text: &str) -> Option<f64> {
    let text = text.trim();
    if !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let naive = match text.len() {
        8 => NaiveDate::parse_from_str(text, "%Y%m%d").ok()?.and_hms_opt(0, 0, 0)?,
        14 => NaiveDateTime::parse_from_str(text, "%Y%m%d%H%M%S").ok()?,
        _ => return None,
    };
    Some(from_datetime(&naive.and_utc()))
}

/// Render a sec85 time for logs and output headers.
pub fn format_iso(sec85: f64) -> String {
    match to_datetime(sec85) {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        None => "NaN".to_string(),
    }
}
