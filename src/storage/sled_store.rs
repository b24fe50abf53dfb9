use std::path::Path;

use sled::IVec;
use tracing::debug;
use tracing::error;
use tracing::instrument;
use tracing::trace;

use super::history_store::BucketFields;
use super::history_store::BucketRecord;
use super::history_store::BucketScan;
use super::history_store::HistoryStore;
use super::init_sled_history_db;
use crate::Result;
use crate::StorageError;

/// Sled-backed history store. The bucket key bytes are the sled key and the
/// bincode-encoded field map is the value, so the engine's ascending key
/// iteration is already chronological.
pub struct SledHistoryStore {
    db: sled::Db,
}

impl SledHistoryStore {
    /// Open the history database at `db_path`, creating it when absent and
    /// resuming prior data when present.
    pub fn open(db_path: impl AsRef<Path> + std::fmt::Debug) -> Result<Self> {
        let db = init_sled_history_db(db_path).map_err(StorageError::IoError)?;
        Ok(Self { db })
    }

    #[cfg(test)]
    pub(crate) fn from_db(db: sled::Db) -> Self {
        Self { db }
    }
}

impl HistoryStore for SledHistoryStore {
    #[instrument(skip(self, fields))]
    fn put_bucket(
        &self,
        bucket: &str,
        fields: &BucketFields,
    ) -> Result<()> {
        trace!("put_bucket with {} fields", fields.len());
        let encoded = bincode::serialize(fields).map_err(StorageError::BincodeError)?;
        self.db.insert(bucket.as_bytes(), IVec::from(encoded))?;
        Ok(())
    }

    fn scan(&self) -> BucketScan {
        Box::new(self.db.iter().map(decode_record))
    }

    fn size_on_disk(&self) -> Result<u64> {
        Ok(self.db.size_on_disk()?)
    }

    fn close(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl Drop for SledHistoryStore {
    fn drop(&mut self) {
        match self.db.flush() {
            Ok(_) => debug!("history store flushed"),
            Err(e) => error!(?e, "failed to flush history store"),
        }
    }
}

fn decode_record(next: std::result::Result<(IVec, IVec), sled::Error>) -> Result<BucketRecord> {
    let (key, value) = next?;
    let bucket =
        String::from_utf8(key.to_vec()).map_err(|e| StorageError::CorruptKey(e.to_string()))?;
    let fields: BucketFields =
        bincode::deserialize(&value).map_err(StorageError::BincodeError)?;
    Ok(BucketRecord { bucket, fields })
}
