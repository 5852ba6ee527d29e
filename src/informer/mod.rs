//! Change-event stream source.
//!
//! # Data Flow
//! ```text
//! kube watcher (list + watch, backoff on error)
//!     → reflector store (cache of the last seen state)
//!     → Notification::{Added, Updated, Deleted}
//!     → every subscriber channel
//!
//! every resync period (once synced):
//!     cache → Updated { old == new } for each object
//! ```
//!
//! # Design Decisions
//! - A relist is diffed against the cache, so objects that vanished while the
//!   watch was down are reported as deleted
//! - `start` spawns and returns at once; consumers that need a complete cache
//!   wait on the [`SyncHandle`]
//! - Subscribers whose receiver was dropped are pruned on the next send

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use k8s_openapi::api::core::v1::Event;
use kube::runtime::reflector::{store::Writer, ObjectRef, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval};

use crate::lifecycle::shutdown::StopSignal;

/// A change observed by the informer.
#[derive(Debug, Clone)]
pub enum Notification<K> {
    Added(Arc<K>),
    Updated { old: Arc<K>, new: Arc<K> },
    Deleted(Arc<K>),
}

type WatchStream<K> = BoxStream<'static, Result<watcher::Event<K>, watcher::Error>>;

/// Watches one resource kind and fans out notifications.
pub struct Informer<K>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Eq + Hash + Clone + Default,
{
    source: WatchStream<K>,
    resync_period: Duration,
    writer: Writer<K>,
    subscribers: Vec<mpsc::UnboundedSender<Notification<K>>>,
    synced: watch::Sender<bool>,
    relist: Vec<K>,
}

/// Informer for `core/v1` events.
pub type EventInformer = Informer<Event>;

/// Build the event informer for a namespace scope (`None` watches all namespaces).
pub fn event_informer(
    client: Client,
    namespace: Option<&str>,
    resync_period: Duration,
) -> EventInformer {
    let api: Api<Event> = match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };
    Informer::new(api, resync_period)
}

impl<K> Informer<K>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Eq + Hash + Clone + Default + Send + Sync,
{
    /// Informer over a live list/watch of `api`.
    pub fn new(api: Api<K>, resync_period: Duration) -> Self {
        let source = watcher(api, watcher::Config::default())
            .default_backoff()
            .boxed();
        Self::from_stream(source, resync_period)
    }

    /// Informer over an arbitrary stream of watch events.
    pub fn from_stream(source: WatchStream<K>, resync_period: Duration) -> Self {
        let (synced, _) = watch::channel(false);
        Self {
            source,
            resync_period,
            writer: Writer::default(),
            subscribers: Vec::new(),
            synced,
            relist: Vec::new(),
        }
    }

    /// Register a consumer. Must be called before [`Informer::start`].
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Notification<K>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Handle reporting whether the initial list has completed.
    pub fn sync_handle(&self) -> SyncHandle {
        SyncHandle {
            rx: self.synced.subscribe(),
        }
    }

    /// Read-only view of the cache.
    pub fn store(&self) -> Store<K> {
        self.writer.as_reader()
    }

    /// Start background synchronization. Returns immediately.
    pub fn start(self, stop: StopSignal) -> JoinHandle<()> {
        tokio::spawn(self.run(stop))
    }

    async fn run(mut self, stop: StopSignal) {
        tracing::info!(
            resync_period_secs = self.resync_period.as_secs(),
            "Informer starting"
        );
        let mut resync = resync_timer(self.resync_period);

        loop {
            tokio::select! {
                _ = stop.fired() => break,
                _ = next_tick(&mut resync) => self.resync(),
                event = self.source.next() => match event {
                    Some(Ok(event)) => self.handle(event),
                    Some(Err(e)) => tracing::warn!(error = %e, "Watch stream error"),
                    None => {
                        tracing::warn!("Watch stream ended");
                        break;
                    }
                },
            }
        }

        tracing::info!("Informer stopped");
    }

    fn handle(&mut self, event: watcher::Event<K>) {
        let store = self.writer.as_reader();
        match &event {
            watcher::Event::Apply(obj) => {
                let key = ObjectRef::from_obj(obj);
                let old = store.get(&key);
                self.writer.apply_watcher_event(&event);
                let new = store.get(&key).unwrap_or_else(|| Arc::new(obj.clone()));
                match old {
                    Some(old) => self.notify(Notification::Updated { old, new }),
                    None => self.notify(Notification::Added(new)),
                }
            }
            watcher::Event::Delete(obj) => {
                let key = ObjectRef::from_obj(obj);
                let last = store.get(&key).unwrap_or_else(|| Arc::new(obj.clone()));
                self.writer.apply_watcher_event(&event);
                self.notify(Notification::Deleted(last));
            }
            watcher::Event::Init => {
                self.relist.clear();
                self.writer.apply_watcher_event(&event);
            }
            watcher::Event::InitApply(obj) => {
                self.relist.push(obj.clone());
                self.writer.apply_watcher_event(&event);
            }
            watcher::Event::InitDone => {
                let mut previous: HashMap<ObjectRef<K>, Arc<K>> = store
                    .state()
                    .into_iter()
                    .map(|obj| (ObjectRef::from_obj(obj.as_ref()), obj))
                    .collect();
                self.writer.apply_watcher_event(&event);

                for obj in std::mem::take(&mut self.relist) {
                    let key = ObjectRef::from_obj(&obj);
                    let new = store.get(&key).unwrap_or_else(|| Arc::new(obj));
                    match previous.remove(&key) {
                        Some(old) => self.notify(Notification::Updated { old, new }),
                        None => self.notify(Notification::Added(new)),
                    }
                }
                for (_, gone) in previous {
                    self.notify(Notification::Deleted(gone));
                }

                let first_sync = !*self.synced.borrow();
                self.synced.send_replace(true);
                if first_sync {
                    tracing::info!(objects = store.state().len(), "Informer synced");
                } else {
                    tracing::debug!(objects = store.state().len(), "Informer relisted");
                }
            }
        }
    }

    fn resync(&mut self) {
        if !*self.synced.borrow() {
            return;
        }
        let state = self.writer.as_reader().state();
        tracing::debug!(objects = state.len(), "Informer resync");
        for obj in state {
            self.notify(Notification::Updated {
                old: obj.clone(),
                new: obj,
            });
        }
    }

    fn notify(&mut self, notification: Notification<K>) {
        self.subscribers
            .retain(|tx| tx.send(notification.clone()).is_ok());
    }
}

fn resync_timer(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }
    Some(time::interval_at(Instant::now() + period, period))
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Reports whether an informer has completed its initial list.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    rx: watch::Receiver<bool>,
}

impl SyncHandle {
    pub fn has_synced(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the initial list. Returns `false` if `stop` fired first or the
    /// informer exited without syncing.
    pub async fn wait_for_sync(&self, stop: &StopSignal) -> bool {
        let mut rx = self.rx.clone();
        tokio::select! {
            synced = rx.wait_for(|synced| *synced) => synced.is_ok(),
            _ = stop.fired() => false,
        }
    }
}
