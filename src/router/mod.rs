//! Event router.
//!
//! Consumes informer notifications and hands every added or updated event to
//! the configured sink. Deletions are only logged; an event expiring from the
//! API server is not itself an event.

pub mod sink;

use k8s_openapi::api::core::v1::Event;
use tokio::sync::mpsc;

use crate::informer::{EventInformer, Notification, SyncHandle};
use crate::lifecycle::shutdown::StopSignal;
use crate::observability::metrics;

pub use sink::{EventSink, SinkError};

/// Forwards cluster events to a sink.
pub struct EventRouter {
    notifications: mpsc::UnboundedReceiver<Notification<Event>>,
    synced: SyncHandle,
    sink: Box<dyn EventSink>,
}

impl EventRouter {
    /// Register with `informer`. Must be called before the informer is started.
    pub fn new(informer: &mut EventInformer, sink: Box<dyn EventSink>) -> Self {
        Self {
            notifications: informer.subscribe(),
            synced: informer.sync_handle(),
            sink,
        }
    }

    /// Route events until `stop` fires.
    ///
    /// Waits for the informer's initial list first. If the informer exits on
    /// its own, the router keeps waiting for `stop` rather than returning early.
    pub async fn run(mut self, stop: StopSignal) {
        tracing::info!("Starting EventRouter");

        if !self.synced.wait_for_sync(&stop).await {
            tracing::warn!("Stopped before the event cache synced");
            return;
        }
        tracing::info!("Event cache synced, routing events");

        loop {
            tokio::select! {
                _ = stop.fired() => break,
                notification = self.notifications.recv() => match notification {
                    Some(notification) => self.route(notification),
                    None => {
                        tracing::warn!("Informer closed its channel, waiting for shutdown");
                        stop.fired().await;
                        break;
                    }
                },
            }
        }

        tracing::info!("Shutting down EventRouter");
    }

    fn route(&self, notification: Notification<Event>) {
        match notification {
            Notification::Added(event) => {
                metrics::record_event(&event);
                self.sink.update_events(&event, None);
            }
            Notification::Updated { old, new } => {
                metrics::record_event(&new);
                self.sink.update_events(&new, Some(&old));
            }
            Notification::Deleted(event) => {
                tracing::debug!(
                    name = event.metadata.name.as_deref().unwrap_or_default(),
                    namespace = event.metadata.namespace.as_deref().unwrap_or_default(),
                    "Event deleted from cache"
                );
            }
        }
    }
}
