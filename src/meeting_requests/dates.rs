//! Lenient date handling for request bodies and list filters.
//!
//! Clients send meeting dates as ISO-8601 date-times, bare `yyyy-MM-dd`
//! strings or Unix seconds. Only the calendar date is kept.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{de, Deserialize, Deserializer};

pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_FORMAT: &str = "%-m/%-d/%Y";

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDate {
    Seconds(i64),
    Text(String),
}

pub fn parse_flexible_date(input: &str) -> Result<Option<NaiveDate>, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(Some(dt.date_naive()));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Some(dt.date()));
        }
    }

    NaiveDate::parse_from_str(trimmed, CANONICAL_FORMAT)
        .map(Some)
        .map_err(|_| format!("Unrecognized date: {trimmed}"))
}

fn from_unix_seconds(seconds: i64) -> Result<NaiveDate, String> {
    DateTime::from_timestamp(seconds, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| format!("Timestamp out of range: {seconds}"))
}

pub fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawDate>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawDate::Text(text)) => parse_flexible_date(&text).map_err(de::Error::custom),
        Some(RawDate::Seconds(seconds)) => from_unix_seconds(seconds)
            .map(Some)
            .map_err(de::Error::custom),
    }
}

/// Query-string dates that fail to parse are treated as absent.
pub fn parse_query_date(input: Option<&str>) -> Option<NaiveDate> {
    input.and_then(|s| parse_flexible_date(s).ok().flatten())
}

pub fn canonical(date: NaiveDate) -> String {
    date.format(CANONICAL_FORMAT).to_string()
}

pub fn display(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_else(|| "—".to_string())
}
