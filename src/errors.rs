//! Collector Pipeline Error Hierarchy
//!
//! Defines error types for the watch/buffer/persist pipeline, categorized by
//! the stage that produces them and by how they are handled: startup errors
//! propagate, steady-state errors are logged and the operation is retried.

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failures while establishing the upstream watch (connect, subscribe)
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// History store failures (open, put, scan, close)
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Settings loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Startup-time watch failures. These are returned to the caller; the
/// service decides whether to stay alive idle or give up.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// etcd endpoint unreachable or handshake failed
    #[error("failed to connect to etcd at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: etcd_client::Error,
    },

    /// Watch subscription could not be created
    #[error("failed to create watch on prefix {prefix}: {source}")]
    WatchCreate {
        prefix: String,
        #[source]
        source: etcd_client::Error,
    },
}

/// Steady-state watch stream failures. Never propagated; the pump logs them
/// and re-subscribes with backoff.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Error received on the live watch stream
    #[error("watch stream error: {0}")]
    Watch(#[from] etcd_client::Error),

    /// Re-subscribe attempt after a stream error failed
    #[error("failed to re-subscribe watch on prefix {prefix}: {source}")]
    Resubscribe {
        prefix: String,
        #[source]
        source: etcd_client::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failures while opening the database directory
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Serialization failures for persisted bucket records
    #[error(transparent)]
    BincodeError(#[from] bincode::Error),

    /// Embedded database errors
    #[error("Embedded database error: {0}")]
    DbError(String),

    /// A stored bucket key was not valid UTF-8
    #[error("corrupt bucket key: {0}")]
    CorruptKey(String),
}

/// Failures during the drain sequence. Logged at the site, never raised past
/// the shutdown coordinator.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    /// Server-side watch cancellation failed
    #[error("error cancelling watch subscription: {0}")]
    WatchCancel(#[source] etcd_client::Error),

    /// Watch pump task panicked or was aborted
    #[error("watch pump task failed: {0}")]
    TaskFailed(#[from] JoinError),

    /// History store did not close cleanly
    #[error("error closing the history store: {0}")]
    StoreClose(String),
}

// ============== Conversion Implementations ============== //
impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        StorageError::DbError(err.to_string()).into()
    }
}
