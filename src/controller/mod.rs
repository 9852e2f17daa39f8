//! # Controller
//!
//! Event-driven Certificate controller.
//!
//! - `backoff`: Fibonacci backoff for watch reconnects
//! - `handler`: Added/Deleted/Modified lifecycle handling
//! - `secret_store`: TLS secret writes with archive-before-replace
//! - `server`: HTTP server for metrics and health checks
//! - `status`: Status write-back
//! - `watcher`: Restartable watch stream
//!
//! Events are processed one at a time, in delivery order. A failing event is
//! logged, counted and dropped; only stream failures cause the watch to be
//! reopened.

pub mod backoff;
pub mod handler;
pub mod secret_store;
pub mod server;
pub mod status;
pub mod watcher;

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::cluster::{CertificateEvent, ClusterClient, WatchEventType};
use crate::config::ControllerConfig;
use crate::issuer::CertificateIssuer;
use crate::observability::metrics;

pub use handler::{AddOutcome, CertificateLifecycleHandler, HandlerError};
pub use secret_store::{SecretStore, SecretStoreError};
pub use server::ServerState;
pub use status::StatusReporter;
pub use watcher::EventWatcher;

/// What processing a single event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Added(AddOutcome),
    Modified,
    Deleted,
}

pub struct Controller {
    handler: CertificateLifecycleHandler,
    issuer: Arc<dyn CertificateIssuer>,
    watcher: EventWatcher,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("handler", &self.handler)
            .field("watcher", &self.watcher)
            .finish_non_exhaustive()
    }
}

impl Controller {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        issuer: Arc<dyn CertificateIssuer>,
        config: &ControllerConfig,
    ) -> Self {
        let handler = CertificateLifecycleHandler::new(
            Arc::clone(&issuer),
            SecretStore::new(Arc::clone(&client)),
            StatusReporter::new(Arc::clone(&client)),
        );
        let watcher = EventWatcher::new(client, config);
        Self {
            handler,
            issuer,
            watcher,
        }
    }

    /// Dispatch one event to the lifecycle handler
    pub async fn process_event(&self, event: &CertificateEvent) -> Result<EventOutcome, HandlerError> {
        metrics::increment_events(event.event_type.as_str());

        let span = info_span!(
            "certificate_event",
            event_type = %event.event_type,
            resource.name = event.object.metadata.name.as_deref().unwrap_or_default(),
            resource.namespace = event.object.metadata.namespace.as_deref().unwrap_or_default(),
        );

        async {
            debug!("Processing event");
            match event.event_type {
                WatchEventType::Added => self
                    .handler
                    .handle_added(&event.object)
                    .await
                    .map(EventOutcome::Added),
                WatchEventType::Modified => {
                    self.handler.handle_modified(&event.object);
                    Ok(EventOutcome::Modified)
                }
                WatchEventType::Deleted => self
                    .handler
                    .handle_deleted(&event.object)
                    .await
                    .map(|()| EventOutcome::Deleted),
            }
        }
        .instrument(span)
        .await
    }

    /// Process one event, dropping it on failure, then list managed certificates
    async fn process_and_log(&self, event: CertificateEvent) {
        match self.process_event(&event).await {
            Ok(outcome) => debug!(?outcome, "Event processed"),
            Err(e) => {
                error!(
                    event_type = %event.event_type,
                    resource.name = ?event.object.metadata.name,
                    resource.namespace = ?event.object.metadata.namespace,
                    "Dropping event after processing error: {}", e
                );
                metrics::increment_event_errors();
            }
        }

        if let Err(e) = self.issuer.list_managed().await {
            warn!("Failed to list managed certificates: {}", e);
        }
    }

    /// Process every event of `events` sequentially until the stream ends
    pub async fn process_events<S>(&self, events: S)
    where
        S: Stream<Item = CertificateEvent>,
    {
        let mut events = std::pin::pin!(events);
        while let Some(event) = events.next().await {
            self.process_and_log(event).await;
        }
    }

    /// Watch Certificates forever
    ///
    /// `server_state` turns ready once the first watch has been opened.
    pub async fn run(&self, server_state: Arc<ServerState>) {
        info!("Starting certificate watch");
        let events = self.watcher.events_with_readiness(server_state);
        self.process_events(events).await;
    }
}
