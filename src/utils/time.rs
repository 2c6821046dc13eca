use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::error::{AppError, Result};
use crate::fetch::request::START_TIME_FORMAT;

const ACCEPTED_FORMATS: &[&str] = &[START_TIME_FORMAT, "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a user-supplied anchor. Accepts the gateway's `YYYYMMDD-HH:MM:SS`,
/// ISO-like date-times and bare `YYYY-MM-DD` dates (midnight).
pub fn parse_anchor(value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();

    for format in ACCEPTED_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| AppError::invalid_format(format!("unrecognized timestamp `{value}`")))
}

pub fn format_bar_time(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

pub fn current_human_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M").to_string()
}
