//! Timestamp helpers
//!
//! The API sends naive ISO-8601 timestamps (UTC, no offset) as well as
//! RFC 3339 ones; both are accepted.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse an API timestamp
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Human-readable distance between `then` and `now` ("3 minutes ago")
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(then);
    let (secs, future) = if delta.num_seconds() < 0 {
        (-delta.num_seconds(), true)
    } else {
        (delta.num_seconds(), false)
    };

    let phrase = if secs < 45 {
        "less than a minute".to_string()
    } else if secs < 90 {
        "1 minute".to_string()
    } else if secs < 45 * 60 {
        format!("{} minutes", (secs + 30) / 60)
    } else if secs < 90 * 60 {
        "about 1 hour".to_string()
    } else if secs < 24 * 3600 {
        format!("about {} hours", (secs + 1800) / 3600)
    } else if secs < 48 * 3600 {
        "1 day".to_string()
    } else {
        format!("{} days", (secs + 43200) / 86400)
    };

    if future {
        format!("in {}", phrase)
    } else {
        format!("{} ago", phrase)
    }
}

/// Relative time for a raw API timestamp.
///
/// Empty input gives an empty string; unparseable input is echoed back.
pub fn describe_timestamp(raw: Option<&str>, now: DateTime<Utc>) -> String {
    match raw {
        None => String::new(),
        Some(raw) => match parse_timestamp(raw) {
            Some(dt) => time_ago(dt, now),
            None => raw.to_string(),
        },
    }
}
