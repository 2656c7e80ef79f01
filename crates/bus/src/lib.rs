//! In-process event bus.
//!
//! Every subscription gets its own bounded queue and a dedicated worker
//! thread that drains it, so callbacks for one subscriber always run one
//! at a time and in publish order, while a slow subscriber never stalls
//! the publisher or its peers. When a queue is full the event is dropped
//! for that subscriber only (best-effort, at-most-once).

use sensemusic_events::{
    Event, EventBus, EventHandler, PublishError, SubscriptionHandle, SubscriptionQuery,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread::JoinHandle;
use tokio::sync::mpsc;

/// Default per-subscriber queue capacity, in events.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Configuration for the local bus.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalBusConfig {
    /// Events buffered per subscriber before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for LocalBusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl LocalBusConfig {
    fn channel_capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

struct Route {
    handle: SubscriptionHandle,
    query: SubscriptionQuery,
    tx: mpsc::Sender<Event>,
    worker: Option<JoinHandle<()>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Publish/subscribe bus for services running in one process.
pub struct LocalBus {
    config: LocalBusConfig,
    routes: Mutex<Vec<Route>>,
    next_handle: AtomicU64,
    dropped_events: AtomicU64,
    closed: AtomicBool,
}

impl LocalBus {
    /// Create a new bus with default configuration.
    pub fn new() -> Self {
        Self::with_config(LocalBusConfig::default())
    }

    /// Create a new bus with custom configuration.
    pub fn with_config(config: LocalBusConfig) -> Self {
        tracing::debug!(
            queue_capacity = config.channel_capacity(),
            "Created local event bus"
        );
        Self {
            config,
            routes: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
            dropped_events: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of deliveries dropped because a subscriber queue was full or
    /// its worker is gone.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.routes).len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the bus: later publishes fail, queued events are still
    /// delivered, and every worker is joined.
    ///
    /// Called from inside a subscriber callback, the calling worker is not
    /// joined and stops on its own once the callback returns.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let routes = std::mem::take(&mut *lock(&self.routes));
        tracing::info!(subscribers = routes.len(), "Shutting down local event bus");
        for route in routes {
            join_route(route);
        }
    }
}

fn join_route(route: Route) {
    let Route {
        handle, tx, worker, ..
    } = route;
    // Dropping the sender ends the worker once its queue is drained.
    drop(tx);
    if let Some(worker) = worker {
        // A callback removing its own subscription cannot wait for itself.
        if worker.thread().id() == std::thread::current().id() {
            tracing::debug!(subscription = handle.0, "Detaching current subscriber worker");
            return;
        }
        if worker.join().is_err() {
            tracing::warn!(subscription = handle.0, "Subscriber worker panicked");
        }
    }
}

fn spawn_worker(
    handle: SubscriptionHandle,
    mut rx: mpsc::Receiver<Event>,
    mut handler: EventHandler,
) -> Option<JoinHandle<()>> {
    let spawned = std::thread::Builder::new()
        .name(format!("bus-subscriber-{}", handle.0))
        .spawn(move || {
            while let Some(event) = rx.blocking_recv() {
                handler(event);
            }
            tracing::debug!(subscription = handle.0, "Subscriber worker stopped");
        });

    match spawned {
        Ok(worker) => Some(worker),
        Err(e) => {
            tracing::error!(subscription = handle.0, "Failed to spawn subscriber worker: {}", e);
            None
        }
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LocalBus {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl EventBus for LocalBus {
    fn subscribe(&self, query: SubscriptionQuery, handler: EventHandler) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = mpsc::channel(self.config.channel_capacity());
        let worker = spawn_worker(handle, rx, handler);

        tracing::debug!(subscription = handle.0, query = %query, "Subscribed");
        lock(&self.routes).push(Route {
            handle,
            query,
            tx,
            worker,
        });
        handle
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let route = {
            let mut routes = lock(&self.routes);
            let Some(index) = routes.iter().position(|r| r.handle == handle) else {
                return false;
            };
            routes.remove(index)
        };
        tracing::debug!(subscription = handle.0, "Unsubscribed");
        join_route(route);
        true
    }

    fn publish(&self, event: Event) -> Result<(), PublishError> {
        if self.is_closed() {
            return Err(PublishError::Closed);
        }

        let routes = lock(&self.routes);
        let mut delivered = 0usize;
        for route in routes.iter().filter(|r| r.query.matches(&event)) {
            match route.tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    let dropped = self.dropped_events.fetch_add(1, Ordering::Relaxed) + 1;
                    // Rate-limit logging: only log every 10th drop to avoid spam
                    if dropped % 10 == 1 {
                        tracing::warn!(
                            dropped,
                            subscription = route.handle.0,
                            name = %event.name,
                            "Subscriber queue full, dropping events"
                        );
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    let dropped = self.dropped_events.fetch_add(1, Ordering::Relaxed) + 1;
                    if dropped % 10 == 1 {
                        tracing::warn!(
                            dropped,
                            subscription = route.handle.0,
                            name = %event.name,
                            has_worker = route.worker.is_some(),
                            "Subscriber worker is gone, dropping events"
                        );
                    }
                }
            }
        }

        tracing::trace!(name = %event.name, seq = event.sequence, delivered, "Published event");
        Ok(())
    }
}
