//! Timestamp normalization
//!
//! Accepted input shapes:
//! - `YYYYmmDDHHMM` (compact)
//! - `YYYY-mm-DD`
//! - `YYYY-mm-DD HH:MM`
//! - `YYYY-mm-DDTHH:MM`
//! - `YYYY-mm-DDTHH:MM:SSZ` (canonical output, so normalization is idempotent)

use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};

/// Format of every normalized timestamp
pub const CANONICAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const COMPACT_FORMAT: &str = "%Y%m%d%H%M";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Convert a timestamp in any accepted shape to `YYYY-mm-DDTHH:MM:SSZ`.
///
/// ```
/// use searchtweets::params::convert_utc_time;
///
/// assert_eq!(convert_utc_time("201708020000").unwrap(), "2017-08-02T00:00:00Z");
/// assert_eq!(convert_utc_time("2017-08-02").unwrap(), "2017-08-02T00:00:00Z");
/// assert_eq!(convert_utc_time("2017-08-02 00:00").unwrap(), "2017-08-02T00:00:00Z");
/// assert_eq!(convert_utc_time("2017-08-02T00:00").unwrap(), "2017-08-02T00:00:00Z");
/// ```
pub fn convert_utc_time(input: &str) -> Result<String> {
    let trimmed = input.trim();
    parse_timestamp(trimmed)
        .map(|parsed| parsed.format(CANONICAL_TIME_FORMAT).to_string())
        .ok_or_else(|| {
            Error::format(
                input,
                "expected YYYYmmDDHHMM, YYYY-mm-DD, YYYY-mm-DD HH:MM or YYYY-mm-DDTHH:MM",
            )
        })
}

fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    if !input.contains(['-', ':']) {
        return NaiveDateTime::parse_from_str(input, COMPACT_FORMAT).ok();
    }

    if let Ok(parsed) = NaiveDateTime::parse_from_str(input, CANONICAL_TIME_FORMAT) {
        return Some(parsed);
    }

    let spaced = input.replace('T', " ");
    NaiveDateTime::parse_from_str(&spaced, DATE_TIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(&spaced, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
