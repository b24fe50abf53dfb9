//! Read side of the history store, shared by the extract and select tools.

use chrono::DateTime;
use chrono::Utc;
use tracing::error;

use crate::storage::HistoryStore;
use crate::utils::time::parse_bucket_key;

/// One field of one bucket, flattened for row-oriented output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRow<'a> {
    pub bucket: &'a str,
    pub key: &'a str,
    pub value: &'a str,
}

/// Inclusive time window over bucket timestamps. A missing bound leaves
/// that side open.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Whether a bucket key falls inside the window. A bucket whose key
    /// does not parse as a timestamp matches only an unbounded range.
    pub fn matches(&self, bucket: &str) -> bool {
        if self.start.is_none() && self.end.is_none() {
            return true;
        }
        let Some(at) = parse_bucket_key(bucket) else {
            return false;
        };
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }
}

/// Stream every stored row through `f`, oldest bucket first, fields in key
/// order within a bucket. A record that fails to decode ends the pass.
pub fn each_row<S, F>(
    store: &S,
    mut f: F,
) where
    S: HistoryStore,
    F: FnMut(HistoryRow<'_>),
{
    for record in store.scan() {
        match record {
            Ok(record) => {
                for (key, value) in &record.fields {
                    f(HistoryRow {
                        bucket: &record.bucket,
                        key,
                        value,
                    });
                }
            }
            Err(e) => {
                error!("error reading the database: {e}");
                break;
            }
        }
    }
}
