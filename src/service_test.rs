use tempfile::TempDir;
use tokio::sync::watch;

use crate::config::Settings;
use crate::Error;
use crate::service::CollectorService;

fn settings(db_file: std::path::PathBuf) -> Settings {
    Settings {
        // Port 1 is never bound; connecting fails immediately.
        etcd_host: "127.0.0.1:1".to_string(),
        db_file,
        ..Settings::default()
    }
}

/// # Case 1: watch open failure leaves the service idle, not dead
///
/// ## Setup
/// 1. Endpoint that refuses connections
/// 2. Shutdown already signalled
///
/// ## Criterias
/// 1. `run` completes with Ok
/// 2. The history database was still created on disk
#[tokio::test]
async fn test_run_idles_then_drains_when_watch_open_fails() {
    let tmp = TempDir::new().unwrap();
    let db_file = tmp.path().join("db");
    let (graceful_tx, graceful_rx) = watch::channel(());
    graceful_tx.send(()).unwrap();

    let service = CollectorService::new(settings(db_file.clone()));
    let result = service.run(graceful_rx).await;

    assert!(result.is_ok());
    assert!(db_file.exists());
}

/// # Case 2: store open failure is fatal
///
/// ## Setup
/// 1. `db_file` nested under a regular file, so the database cannot be
///    created
///
/// ## Criterias
/// 1. `run` returns a storage error before touching the endpoint
#[tokio::test]
async fn test_run_fails_when_store_cannot_open() {
    let tmp = TempDir::new().unwrap();
    let blocker = tmp.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let (_graceful_tx, graceful_rx) = watch::channel(());
    let service = CollectorService::new(settings(blocker.join("db")));
    let result = service.run(graceful_rx).await;

    assert!(matches!(result, Err(Error::Storage(_))));
}
