//! Daemon assembly: store, watcher, scheduler and shutdown glued together.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::error;
use tracing::info;

use crate::ChangeWatcher;
use crate::Collector;
use crate::config::Settings;
use crate::DrainTrigger;
use crate::FlushScheduler;
use crate::Result;
use crate::ShutdownCoordinator;
use crate::storage::SledHistoryStore;

/// Backpressure bound between the watch pump and the collector.
const INTAKE_CHANNEL_CAPACITY: usize = 1024;

/// The collector daemon. Owns nothing until `run`; everything is assembled
/// there and torn down before `run` returns.
pub struct CollectorService {
    settings: Settings,
}

impl CollectorService {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Run the pipeline until a shutdown signal or stream end, then drain.
    ///
    /// A store that cannot open is fatal. A watch that cannot open is not:
    /// the failure is logged and the process idles until a signal arrives,
    /// collecting nothing.
    pub async fn run(
        &self,
        mut shutdown_signal: watch::Receiver<()>,
    ) -> Result<()> {
        // 1. Open (or resume) the history store
        let store = Arc::new(SledHistoryStore::open(&self.settings.db_file)?);
        let mut collector = Collector::new(store.clone());

        // 2. Subscribe to the configured prefix
        let (intake_tx, mut intake) = mpsc::channel(INTAKE_CHANNEL_CAPACITY);
        let watcher = match ChangeWatcher::open(
            &self.settings.etcd_host,
            &self.settings.etcd_path,
            intake_tx,
        )
        .await
        {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                error!("failed to open the watcher, collecting nothing: {e}");
                None
            }
        };

        // 3. Drive the collector until shutdown or stream end
        let trigger = if watcher.is_some() {
            let scheduler = FlushScheduler::new(
                self.settings.flush_interval(),
                self.settings.report_interval(),
            );
            scheduler.run(&mut collector, &mut intake, &mut shutdown_signal).await
        } else {
            // Idle: nothing is being collected, wait for the signal
            let _ = shutdown_signal.changed().await;
            DrainTrigger::Shutdown
        };
        info!("collector stopping: {:?}", trigger);

        // 4. Drain the pipeline and close the store
        let mut coordinator = ShutdownCoordinator::new();
        coordinator.run(watcher, &mut intake, &mut collector, store.as_ref()).await;

        Ok(())
    }
}
