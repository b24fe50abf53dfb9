use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tracing::warn;

use super::ChangeEvent;
use super::Collector;
use crate::storage::HistoryStore;

/// Why the scheduler loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainTrigger {
    /// A process signal was observed on the shutdown channel.
    Shutdown,
    /// The watch pump closed the intake channel.
    StreamEnd,
}

/// Drives the collector: multiplexes the event intake with the flush and
/// report timers until shutdown or stream end. Timer driving stops for good
/// once `run` returns; only the shutdown drain touches the collector after
/// that.
pub struct FlushScheduler {
    flush_interval: Duration,
    report_interval: Duration,
}

impl FlushScheduler {
    pub fn new(
        flush_interval: Duration,
        report_interval: Duration,
    ) -> Self {
        Self {
            flush_interval,
            report_interval,
        }
    }

    pub async fn run<S>(
        &self,
        collector: &mut Collector<S>,
        intake: &mut mpsc::Receiver<ChangeEvent>,
        shutdown_signal: &mut watch::Receiver<()>,
    ) -> DrainTrigger
    where
        S: HistoryStore,
    {
        let mut flush_tick = self.dynamic_interval(self.flush_interval);
        let mut report_tick = self.dynamic_interval(self.report_interval);

        loop {
            tokio::select! {
                // Use biased to ensure branch order
                biased;
                // P0: shutdown received;
                _ = shutdown_signal.changed() => {
                    warn!("[FlushScheduler] shutdown signal received.");
                    return DrainTrigger::Shutdown;
                }
                // P1: move finalized buckets to the store
                _ = flush_tick.tick() => {
                    collector.flush(false);
                }
                // P2: periodic stats line
                _ = report_tick.tick() => {
                    collector.report();
                }
                // P3: change events in real time
                maybe_event = intake.recv() => {
                    match maybe_event {
                        Some(event) => collector.store(event),
                        None => {
                            warn!("[FlushScheduler] intake channel closed, stopping.");
                            return DrainTrigger::StreamEnd;
                        }
                    }
                }
            }
        }
    }

    /// Timer that first fires one full period after start.
    /// Behavior: if multiple ticks are missed, the timer waits for the next
    /// tick instead of firing immediately.
    fn dynamic_interval(
        &self,
        period: Duration,
    ) -> tokio::time::Interval {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }
}
