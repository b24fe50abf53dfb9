use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;

use super::ChangeEvent;
use crate::storage::BucketFields;
use crate::storage::HistoryStore;
use crate::storage::StoreStats;
use crate::utils::time::bucket_key;

/// In-memory bucket aggregator and the single writer of the history store.
///
/// Events merge into the bucket of their arrival second, last write wins
/// per field key. On every flush cycle the finalized buckets move to the
/// store; the newest bucket stays in memory because its second may still be
/// receiving events. A bucket only leaves memory after its put succeeded,
/// so a failed write is retried on the next cycle.
pub struct Collector<S> {
    store: Arc<S>,
    buckets: BTreeMap<String, BucketFields>,
    writes: u64,
}

impl<S> Collector<S>
where S: HistoryStore
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            buckets: BTreeMap::new(),
            writes: 0,
        }
    }

    /// Merge one change event into the bucket of the current second.
    pub fn store(
        &mut self,
        event: ChangeEvent,
    ) {
        self.store_at(event, Utc::now());
    }

    pub(crate) fn store_at(
        &mut self,
        event: ChangeEvent,
        at: DateTime<Utc>,
    ) {
        let bucket = bucket_key(at);
        trace!("buffering {} into bucket {}", event.key, bucket);
        self.buckets.entry(bucket).or_default().insert(event.key, event.value);
    }

    /// Persist buffered buckets in ascending key order and return how many
    /// were written. Unless `force` is set, the lexically last bucket is
    /// kept back.
    pub fn flush(
        &mut self,
        force: bool,
    ) -> usize {
        let mut pending: Vec<String> = self.buckets.keys().cloned().collect();
        if !force {
            pending.pop();
        }

        let mut written = 0;
        for bucket in pending {
            let Some(fields) = self.buckets.get(&bucket) else {
                continue;
            };
            if let Err(e) = self.store.put_bucket(&bucket, fields) {
                error!(bucket = %bucket, "failed to persist bucket, keeping it buffered: {e}");
                continue;
            }
            self.buckets.remove(&bucket);
            self.writes += 1;
            written += 1;
        }

        if written > 0 {
            debug!("flushed {} bucket(s), {} still buffered", written, self.buckets.len());
        }
        written
    }

    /// Scan the store and emit the stats line.
    pub fn report(&self) {
        let stats = StoreStats::collect(self.store.as_ref());
        info!(
            writes = self.writes,
            bytes = stats.bytes,
            elements = stats.elements,
            entries = stats.entries,
            keysizes = stats.keysizes,
            totsizes = stats.totsizes(),
            valsizes = stats.valsizes,
            "collector report"
        );
    }

    /// Forced flush followed by a final report. Runs once, during shutdown.
    pub fn drain(&mut self) {
        let written = self.flush(true);
        debug!("drain flushed {} bucket(s)", written);
        self.report();
    }

    /// Buckets written to the store since startup.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Buckets currently buffered in memory.
    pub fn buffered(&self) -> usize {
        self.buckets.len()
    }
}
