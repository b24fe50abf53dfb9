use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use mockall::Sequence;

use super::*;
use crate::storage::BucketFields;
use crate::storage::HistoryStore;
use crate::storage::MockHistoryStore;
use crate::storage::SledHistoryStore;
use crate::storage::StoreStats;
use crate::StorageError;
use crate::utils::time::bucket_key;

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

fn fields(pairs: &[(&str, &str)]) -> BucketFields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// Case 1: two events for the same key in the same second collapse into one
// bucket with the last value; a plain flush holds the bucket back while a
// forced flush writes it.
#[test]
fn test_same_second_last_write_wins() {
    let base = 1705314645;
    let expected_bucket = bucket_key(at(base));
    let expected_fields = fields(&[("service/a", "2")]);

    let mut mock = MockHistoryStore::new();
    mock.expect_put_bucket()
        .withf(move |bucket, fields| bucket == expected_bucket && *fields == expected_fields)
        .times(1)
        .returning(|_, _| Ok(()));

    let mut collector = Collector::new(Arc::new(mock));
    collector.store_at(ChangeEvent::new("service/a", "1"), at(base));
    collector.store_at(ChangeEvent::new("service/a", "2"), at(base));
    assert_eq!(collector.buffered(), 1);

    // The only bucket is still open
    assert_eq!(collector.flush(false), 0);
    assert_eq!(collector.writes(), 0);

    assert_eq!(collector.flush(true), 1);
    assert_eq!(collector.writes(), 1);
    assert_eq!(collector.buffered(), 0);
}

// Case 2: events in two adjacent seconds; a plain flush persists the older
// bucket only and the open one survives in memory.
#[test]
fn test_open_bucket_is_held_back() {
    let base = 1705314645;
    let older_bucket = bucket_key(at(base));

    let mut mock = MockHistoryStore::new();
    mock.expect_put_bucket()
        .withf(move |bucket, _| bucket == older_bucket)
        .times(1)
        .returning(|_, _| Ok(()));

    let mut collector = Collector::new(Arc::new(mock));
    collector.store_at(ChangeEvent::new("service/a", "1"), at(base));
    collector.store_at(ChangeEvent::new("service/b", "2"), at(base + 1));

    assert_eq!(collector.flush(false), 1);
    assert_eq!(collector.writes(), 1);
    assert_eq!(collector.buffered(), 1);
}

// Case 3: a failed put keeps the bucket buffered and the write counter
// untouched; the next flush retries and succeeds.
#[test]
fn test_failed_put_keeps_bucket_buffered() {
    let mut seq = Sequence::new();
    let mut mock = MockHistoryStore::new();
    mock.expect_put_bucket()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(StorageError::DbError("io failure".to_string()).into()));
    mock.expect_put_bucket()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));

    let mut collector = Collector::new(Arc::new(mock));
    collector.store_at(ChangeEvent::new("service/a", "1"), at(1705314645));

    assert_eq!(collector.flush(true), 0);
    assert_eq!(collector.writes(), 0);
    assert_eq!(collector.buffered(), 1);

    assert_eq!(collector.flush(true), 1);
    assert_eq!(collector.writes(), 1);
    assert_eq!(collector.buffered(), 0);
}

// Case 4: distinct keys within one second accumulate in the same bucket.
#[test]
fn test_distinct_keys_share_one_bucket() {
    let base = 1705314645;
    let expected = fields(&[("service/a", "1"), ("service/b", "2")]);

    let mut mock = MockHistoryStore::new();
    mock.expect_put_bucket()
        .withf(move |_, fields| *fields == expected)
        .times(1)
        .returning(|_, _| Ok(()));

    let mut collector = Collector::new(Arc::new(mock));
    collector.store_at(ChangeEvent::new("service/a", "1"), at(base));
    collector.store_at(ChangeEvent::new("service/b", "2"), at(base));

    assert_eq!(collector.flush(true), 1);
}

// Case 5: drain is a forced flush plus a final report over the store.
#[test]
fn test_drain_flushes_everything_and_reports() {
    let mut mock = MockHistoryStore::new();
    mock.expect_put_bucket().times(2).returning(|_, _| Ok(()));
    mock.expect_scan().times(1).returning(|| Box::new(std::iter::empty()));
    mock.expect_size_on_disk().times(1).returning(|| Ok(0));

    let mut collector = Collector::new(Arc::new(mock));
    collector.store_at(ChangeEvent::new("service/a", "1"), at(1705314645));
    collector.store_at(ChangeEvent::new("service/a", "2"), at(1705314646));

    collector.drain();

    assert_eq!(collector.writes(), 2);
    assert_eq!(collector.buffered(), 0);
}

// Case 6: stats math over a real store. Bucket keys are 24 bytes each;
// valsizes counts field key plus field value bytes.
#[test]
fn test_report_stats_math() {
    let tempdir = tempfile::tempdir().unwrap();
    let store = Arc::new(SledHistoryStore::open(tempdir.path().join("history")).unwrap());

    let mut collector = Collector::new(store.clone());
    let base = 1705314645;
    collector.store_at(ChangeEvent::new("ab", "cde"), at(base));
    collector.store_at(ChangeEvent::new("fg", "h"), at(base));
    collector.store_at(ChangeEvent::new("ij", "klm"), at(base + 1));
    assert_eq!(collector.flush(true), 2);
    store.close().unwrap();

    let stats = StoreStats::collect(store.as_ref());
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.elements, 3);
    assert_eq!(stats.keysizes, 48); // two 24-byte bucket keys
    assert_eq!(stats.valsizes, (2 + 3) + (2 + 1) + (2 + 3));
    assert_eq!(stats.totsizes(), stats.keysizes + stats.valsizes);
    assert!(stats.bytes > 0);
}

// Case 7: flushing an empty collector writes nothing.
#[test]
fn test_flush_with_nothing_buffered() {
    let mock = MockHistoryStore::new();
    let mut collector = Collector::new(Arc::new(mock));

    assert_eq!(collector.flush(false), 0);
    assert_eq!(collector.flush(true), 0);
    assert_eq!(collector.writes(), 0);
}
