//! Ordered teardown of the pipeline.
//!
//! Triggered once, by a process signal or by the watch stream ending. The
//! drain order is what keeps the history complete: stop intake first, move
//! everything buffered into the store, and only then close the store.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::debug;
use tracing::error;

use crate::ChangeEvent;
use crate::ChangeWatcher;
use crate::Collector;
use crate::ShutdownError;
use crate::storage::HistoryStore;

/// Pause between closing the store and reporting the process as exited,
/// giving in-flight log writes a moment to settle.
const EXIT_GRACE_DELAY: Duration = Duration::from_millis(100);

/// Shutdown progress, strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleStage {
    Running,
    Draining,
    Closed,
    Exited,
}

/// Runs the drain sequence exactly once.
pub struct ShutdownCoordinator {
    stage: LifecycleStage,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            stage: LifecycleStage::Running,
        }
    }

    pub fn stage(&self) -> LifecycleStage {
        self.stage
    }

    /// Drain and close the pipeline.
    ///
    /// 1. Draining: close the watcher so no new events arrive, empty the
    ///    intake channel into the collector, then forced flush plus final
    ///    report.
    /// 2. Closed: close the history store. A close failure is logged, not
    ///    raised; there is nothing left to do with it.
    /// 3. Exited: reached after the grace delay.
    pub async fn run<S>(
        &mut self,
        mut watcher: Option<ChangeWatcher>,
        intake: &mut mpsc::Receiver<ChangeEvent>,
        collector: &mut Collector<S>,
        store: &S,
    ) where
        S: HistoryStore,
    {
        self.advance(LifecycleStage::Draining);
        if let Some(watcher) = watcher.as_mut() {
            watcher.close().await;
        }
        intake.close();
        while let Ok(event) = intake.try_recv() {
            collector.store(event);
        }
        collector.drain();

        self.advance(LifecycleStage::Closed);
        if let Err(e) = store.close() {
            error!("{}", ShutdownError::StoreClose(e.to_string()));
        }

        sleep(EXIT_GRACE_DELAY).await;
        self.advance(LifecycleStage::Exited);
    }

    fn advance(
        &mut self,
        next: LifecycleStage,
    ) {
        debug!("lifecycle {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
