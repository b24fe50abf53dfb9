use chrono::DateTime;
use chrono::Utc;

use crate::utils::time::bucket_key;
use crate::utils::time::parse_bucket_key;
use crate::utils::time::parse_time_bound;

fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, nanos).unwrap()
}

#[test]
fn test_bucket_key_floors_to_whole_second() {
    // 2024-01-15T10:30:45.987Z floors to the .000Z of the same second
    assert_eq!(bucket_key(at(1705314645, 987_000_000)), "2024-01-15T10:30:45.000Z");
    assert_eq!(bucket_key(at(1705314645, 0)), "2024-01-15T10:30:45.000Z");
}

#[test]
fn test_bucket_key_lexical_order_is_chronological() {
    let keys: Vec<String> = (0..5).map(|i| bucket_key(at(1705314645 + i, 0))).collect();

    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn test_parse_bucket_key_round_trip() {
    let instant = at(1705314645, 0);
    let key = bucket_key(instant);

    assert_eq!(parse_bucket_key(&key), Some(instant));
    assert_eq!(parse_bucket_key("not-a-timestamp"), None);
    assert_eq!(parse_bucket_key(""), None);
}

#[test]
fn test_parse_time_bound_accepts_common_shapes() {
    assert_eq!(parse_time_bound("2024-01-15T10:30:45.000Z"), Some(at(1705314645, 0)));
    assert_eq!(parse_time_bound("2024-01-15T10:30:45"), Some(at(1705314645, 0)));
    // Bare date means midnight UTC
    assert_eq!(parse_time_bound("2024-01-15"), Some(at(1705276800, 0)));
    assert_eq!(parse_time_bound("yesterday"), None);
}

#[test]
fn test_current_instant_key_is_parseable() {
    let key = bucket_key(Utc::now());
    let parsed = parse_bucket_key(&key).unwrap();

    // Floored key is never ahead of the clock
    assert!(parsed <= Utc::now());
}
