use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::SecondsFormat;
use chrono::Timelike;
use chrono::Utc;

/// Bucket key for the given instant: UTC, floored to the whole second,
/// rendered as ISO-8601 with milliseconds, e.g. `2024-01-15T10:30:45.000Z`.
/// Lexical order of bucket keys equals chronological order.
pub fn bucket_key(at: DateTime<Utc>) -> String {
    let floored = at.with_nanosecond(0).unwrap_or(at);
    floored.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored bucket key back into an instant. Returns `None` for keys
/// that are not valid RFC 3339 timestamps.
pub fn parse_bucket_key(key: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(key)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

/// Parse a user-supplied time bound. Accepts RFC 3339, a date-time without
/// zone (interpreted as UTC) and a bare date (midnight UTC).
pub fn parse_time_bound(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Some(at.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|at| at.and_utc());
    }
    None
}
