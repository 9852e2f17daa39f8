//! # Event Watcher
//!
//! Endless stream of Certificate events over a series of watch streams.
//!
//! Each underlying watch is opened from scratch with resource version `0`, so
//! the API server replays existing objects as `ADDED` after every reconnect.
//! Reconnects after failures wait on a [`FibonacciBackoff`] that resets after
//! the next received event; a stream that simply ends (server timeout) is
//! reopened after a fixed delay.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tracing::{debug, info, warn};

use super::backoff::FibonacciBackoff;
use super::server::ServerState;
use crate::cluster::{CertificateEvent, CertificateEventStream, ClusterClient};
use crate::config::ControllerConfig;
use crate::observability::metrics;

#[derive(Clone)]
pub struct EventWatcher {
    client: Arc<dyn ClusterClient>,
    timeout_secs: u32,
    backoff_start_ms: u64,
    backoff_max_ms: u64,
    restart_delay: Duration,
}

impl std::fmt::Debug for EventWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventWatcher")
            .field("timeout_secs", &self.timeout_secs)
            .field("backoff_start_ms", &self.backoff_start_ms)
            .field("backoff_max_ms", &self.backoff_max_ms)
            .field("restart_delay", &self.restart_delay)
            .finish_non_exhaustive()
    }
}

struct WatchState {
    client: Arc<dyn ClusterClient>,
    timeout_secs: u32,
    backoff: FibonacciBackoff,
    restart_delay: Duration,
    current: Option<CertificateEventStream>,
    readiness: Option<Arc<ServerState>>,
}

impl WatchState {
    async fn reopen_after_error(&mut self, reason: &'static str) {
        self.current = None;
        metrics::increment_watch_restarts(reason);
        let delay = self.backoff.next_backoff();
        debug!(delay_ms = delay.as_millis() as u64, "Backing off before reopening watch");
        tokio::time::sleep(delay).await;
    }
}

impl EventWatcher {
    pub fn new(client: Arc<dyn ClusterClient>, config: &ControllerConfig) -> Self {
        Self {
            client,
            timeout_secs: config.watch_timeout_secs,
            backoff_start_ms: config.backoff_start_ms,
            backoff_max_ms: config.backoff_max_ms,
            restart_delay: config.watch_restart_delay_after_end_duration(),
        }
    }

    /// Unbounded event stream; never yields an error and never ends
    pub fn events(&self) -> BoxStream<'static, CertificateEvent> {
        self.stream(None)
    }

    /// Like [`events`](Self::events), marking `readiness` ready once a watch is open
    pub fn events_with_readiness(
        &self,
        readiness: Arc<ServerState>,
    ) -> BoxStream<'static, CertificateEvent> {
        self.stream(Some(readiness))
    }

    fn stream(&self, readiness: Option<Arc<ServerState>>) -> BoxStream<'static, CertificateEvent> {
        let state = WatchState {
            client: Arc::clone(&self.client),
            timeout_secs: self.timeout_secs,
            backoff: FibonacciBackoff::new(self.backoff_start_ms, self.backoff_max_ms),
            restart_delay: self.restart_delay,
            current: None,
            readiness,
        };

        stream::unfold(state, |mut state| async move {
            loop {
                if state.current.is_none() {
                    match state.client.watch_certificates(state.timeout_secs).await {
                        Ok(opened) => {
                            info!(timeout_secs = state.timeout_secs, "Watching certificates");
                            if let Some(readiness) = &state.readiness {
                                readiness.mark_ready();
                            }
                            state.current = Some(opened);
                        }
                        Err(e) => {
                            warn!("Failed to open certificate watch: {}", e);
                            state.reopen_after_error("open_error").await;
                            continue;
                        }
                    }
                }

                let Some(current) = state.current.as_mut() else {
                    continue;
                };

                match current.next().await {
                    Some(Ok(event)) => {
                        state.backoff.reset();
                        return Some((event, state));
                    }
                    Some(Err(e)) => {
                        warn!("Certificate watch failed, reopening: {}", e);
                        state.reopen_after_error("stream_error").await;
                    }
                    None => {
                        debug!("Certificate watch ended, reopening");
                        state.current = None;
                        metrics::increment_watch_restarts("stream_end");
                        tokio::time::sleep(state.restart_delay).await;
                    }
                }
            }
        })
        .boxed()
    }
}
