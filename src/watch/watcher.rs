use std::sync::Arc;
use std::time::Duration;

use etcd_client::Client;
use etcd_client::ConnectOptions;
use etcd_client::EventType;
use etcd_client::Watcher;
use etcd_client::WatchOptions;
use etcd_client::WatchStream;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::ChangeEvent;
use crate::ConnectionError;
use crate::Result;
use crate::ShutdownError;
use crate::StreamError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Re-subscribe backoff doubles per failed attempt up to the cap.
const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(1);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Owns the etcd watch subscription and the pump task forwarding put events
/// into the collector intake.
///
/// Only put events are forwarded. A transient stream error re-subscribes
/// with backoff; a server-side cancel or stream end stops the pump, which
/// closes the intake channel and lets the scheduler drain.
pub struct ChangeWatcher {
    watcher: Arc<Mutex<Option<Watcher>>>,
    pump: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl ChangeWatcher {
    /// Connect to `endpoint` and subscribe to all keys under `prefix`.
    ///
    /// # Errors
    /// Returns a connection error when the endpoint is unreachable or the
    /// watch cannot be created. The caller decides whether that is fatal.
    pub async fn open(
        endpoint: &str,
        prefix: &str,
        intake: mpsc::Sender<ChangeEvent>,
    ) -> Result<Self> {
        let options = ConnectOptions::new().with_connect_timeout(CONNECT_TIMEOUT);
        let mut client =
            Client::connect([endpoint], Some(options))
                .await
                .map_err(|e| ConnectionError::Connect {
                    endpoint: endpoint.to_string(),
                    source: e,
                })?;

        let (watcher, stream) = client
            .watch(prefix, Some(WatchOptions::new().with_prefix()))
            .await
            .map_err(|e| ConnectionError::WatchCreate {
                prefix: prefix.to_string(),
                source: e,
            })?;
        info!("watcher connected to {} on prefix {}", endpoint, prefix);

        let watcher = Arc::new(Mutex::new(Some(watcher)));
        let cancel_token = CancellationToken::new();
        let pump = tokio::spawn(pump_events(
            client,
            prefix.to_string(),
            stream,
            watcher.clone(),
            intake,
            cancel_token.clone(),
        ));

        Ok(Self {
            watcher,
            pump: Some(pump),
            cancel_token,
        })
    }

    /// Cancel the subscription and stop the pump, awaiting both. Safe to
    /// call more than once; errors are logged, not raised.
    pub async fn close(&mut self) {
        self.cancel_token.cancel();
        if let Err(e) = self.cancel_subscription().await {
            warn!("{e}");
        }
        if let Some(pump) = self.pump.take() {
            if let Err(e) = pump.await.map_err(ShutdownError::TaskFailed) {
                error!("{e}");
            }
            info!("watcher closed");
        }
    }

    async fn cancel_subscription(&self) -> std::result::Result<(), ShutdownError> {
        let mut guard = self.watcher.lock().await;
        if let Some(mut watcher) = guard.take() {
            watcher.cancel().await.map_err(ShutdownError::WatchCancel)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn disconnected() -> Self {
        Self {
            watcher: Arc::new(Mutex::new(None)),
            pump: None,
            cancel_token: CancellationToken::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

async fn pump_events(
    mut client: Client,
    prefix: String,
    mut stream: WatchStream,
    watcher: Arc<Mutex<Option<Watcher>>>,
    intake: mpsc::Sender<ChangeEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            message = stream.message() => message,
        };

        match message {
            Ok(Some(response)) => {
                if response.canceled() {
                    info!("watch subscription canceled by server");
                    break;
                }
                for event in response.events() {
                    if !matches!(event.event_type(), EventType::Put) {
                        continue;
                    }
                    let Some(kv) = event.kv() else {
                        continue;
                    };
                    let change = ChangeEvent::from_bytes(kv.key(), kv.value());
                    if intake.send(change).await.is_err() {
                        // Collector side is gone, nothing left to pump for
                        return;
                    }
                }
            }
            Ok(None) => {
                warn!("watch stream ended");
                break;
            }
            Err(e) => {
                error!("{}", StreamError::Watch(e));
                match resubscribe(&mut client, &prefix, &watcher, &cancel_token).await {
                    Some(new_stream) => stream = new_stream,
                    None => break,
                }
            }
        }
    }
}

/// Re-establish the watch after a stream error. Returns the fresh stream,
/// or `None` when cancelled while waiting.
async fn resubscribe(
    client: &mut Client,
    prefix: &str,
    watcher: &Arc<Mutex<Option<Watcher>>>,
    cancel_token: &CancellationToken,
) -> Option<WatchStream> {
    let mut delay = RECONNECT_BASE_DELAY;
    loop {
        warn!("watcher disconnected, retrying in {:?}", delay);
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return None,
            _ = sleep(delay) => {}
        }

        match client.watch(prefix, Some(WatchOptions::new().with_prefix())).await {
            Ok((new_watcher, new_stream)) => {
                info!("watcher reconnected on prefix {}", prefix);
                *watcher.lock().await = Some(new_watcher);
                return Some(new_stream);
            }
            Err(e) => {
                warn!(
                    "{}",
                    StreamError::Resubscribe {
                        prefix: prefix.to_string(),
                        source: e,
                    }
                );
                delay = (delay * 2).min(RECONNECT_MAX_DELAY);
            }
        }
    }
}
