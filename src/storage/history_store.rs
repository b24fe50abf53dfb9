//! HistoryStore
//!
//! Persistence seam for time-bucketed change records. The collector is the
//! single logical writer; the extraction tools are read-only consumers.

use std::collections::BTreeMap;

#[cfg(test)]
use mockall::automock;
use tracing::error;

use crate::Result;

/// Ordered field map of one time bucket: source key to last observed value.
pub type BucketFields = BTreeMap<String, String>;

/// Lazy ascending iteration over stored buckets. Decode failures surface per
/// record.
pub type BucketScan = Box<dyn Iterator<Item = Result<BucketRecord>> + Send>;

/// One persisted time bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRecord {
    /// ISO-8601 bucket key, e.g. `2024-01-15T10:30:45.000Z`
    pub bucket: String,
    pub fields: BucketFields,
}

/// Aggregate view of everything the store holds. All sizes are byte
/// lengths of the stored strings, not on-disk encoding sizes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of bucket records
    pub entries: u64,
    /// Total number of fields across all buckets
    pub elements: u64,
    /// Summed length of the bucket keys, each counted once
    pub keysizes: u64,
    /// Summed length of field keys plus field values
    pub valsizes: u64,
    /// Store size on disk
    pub bytes: u64,
}

impl StoreStats {
    /// Collect stats with one full scan. A scan failure aborts the pass at
    /// the failing record; what was counted so far is kept.
    pub fn collect<S: HistoryStore>(store: &S) -> Self {
        let mut stats = Self::default();
        for record in store.scan() {
            match record {
                Ok(record) => {
                    stats.entries += 1;
                    stats.keysizes += record.bucket.len() as u64;
                    for (key, value) in &record.fields {
                        stats.elements += 1;
                        stats.valsizes += (key.len() + value.len()) as u64;
                    }
                }
                Err(e) => {
                    error!("error reading the database: {e}");
                    break;
                }
            }
        }
        match store.size_on_disk() {
            Ok(bytes) => stats.bytes = bytes,
            Err(e) => error!("error reading the database size: {e}"),
        }
        stats
    }

    pub fn totsizes(&self) -> u64 {
        self.keysizes + self.valsizes
    }
}

#[cfg_attr(test, automock)]
pub trait HistoryStore: Send + Sync + 'static {
    /// Upsert one bucket record.
    fn put_bucket(
        &self,
        bucket: &str,
        fields: &BucketFields,
    ) -> Result<()>;

    /// Iterate every stored bucket in ascending key order. The iterator is
    /// finite and restartable; each call starts a fresh pass.
    fn scan(&self) -> BucketScan;

    /// Bytes occupied on disk.
    fn size_on_disk(&self) -> Result<u64>;

    /// Flush pending writes and release the store. Idempotent.
    fn close(&self) -> Result<()>;
}
