//! Event bus abstraction for decoupled publish/subscribe.
//!
//! Services depend on the `EventBus` trait only, so the core logic can be
//! driven by an in-process transport, a remote broker adapter, or the
//! synchronous `InMemoryEventBus` in tests.

use crate::event::Event;
use crate::query::SubscriptionQuery;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Callback invoked for every delivered event.
///
/// A bus owns each handler exclusively and never calls the same handler
/// from two threads at once, so handlers may hold mutable state.
pub type EventHandler = Box<dyn FnMut(Event) + Send + 'static>;

/// Identifies one registered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Errors returned by `EventBus::publish`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The bus has been shut down.
    #[error("event bus is closed")]
    Closed,

    /// The transport refused the event.
    #[error("publish rejected: {0}")]
    Rejected(String),
}

/// Publish/subscribe transport.
///
/// Delivery is best-effort and at-most-once, with no ordering guarantee
/// across publishers.
pub trait EventBus: Send + Sync {
    /// Register `handler` for every future event matching `query`.
    fn subscribe(&self, query: SubscriptionQuery, handler: EventHandler) -> SubscriptionHandle;

    /// Remove a subscription. Returns false if the handle was unknown.
    fn unsubscribe(&self, handle: SubscriptionHandle) -> bool;

    /// Publish an event to all matching subscribers.
    fn publish(&self, event: Event) -> Result<(), PublishError>;
}

/// Type alias for shared event bus reference.
pub type EventBusRef = Arc<dyn EventBus>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Subscriber {
    handle: SubscriptionHandle,
    query: SubscriptionQuery,
    active: AtomicBool,
    handler: Mutex<EventHandler>,
}

/// Synchronous in-memory event bus for testing.
///
/// Records every published event and delivers it to matching subscribers
/// on the publishing thread before `publish` returns. A handler that
/// publishes while being dispatched has its event queued and delivered
/// after the current one, so nested publishes never re-enter a handler.
/// Handlers may also subscribe and unsubscribe: the subscriber list is
/// not locked while they run.
#[derive(Default)]
pub struct InMemoryEventBus {
    published: Mutex<Vec<Event>>,
    pending: Mutex<VecDeque<Event>>,
    subscribers: Mutex<Vec<Arc<Subscriber>>>,
    dispatching: AtomicBool,
    closed: AtomicBool,
    next_handle: AtomicU64,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all published events.
    pub fn events(&self) -> Vec<Event> {
        lock(&self.published).clone()
    }

    /// Get published events with a specific name.
    pub fn events_named(&self, name: &str) -> Vec<Event> {
        lock(&self.published)
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        lock(&self.published).clear();
    }

    /// Get the number of recorded events.
    pub fn len(&self) -> usize {
        lock(&self.published).len()
    }

    /// Check if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        lock(&self.published).is_empty()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Make every later publish fail with `PublishError::Closed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn drain(&self) {
        loop {
            let Some(event) = lock(&self.pending).pop_front() else {
                break;
            };
            let matching: Vec<Arc<Subscriber>> = lock(&self.subscribers)
                .iter()
                .filter(|s| s.query.matches(&event))
                .cloned()
                .collect();
            for subscriber in matching {
                // Skip subscribers removed by an earlier handler for this event.
                if !subscriber.active.load(Ordering::SeqCst) {
                    continue;
                }
                let mut handler = lock(&subscriber.handler);
                (*handler)(event.clone());
            }
        }
    }
}

impl EventBus for InMemoryEventBus {
    fn subscribe(&self, query: SubscriptionQuery, handler: EventHandler) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        lock(&self.subscribers).push(Arc::new(Subscriber {
            handle,
            query,
            active: AtomicBool::new(true),
            handler: Mutex::new(handler),
        }));
        handle
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut subscribers = lock(&self.subscribers);
        let Some(index) = subscribers.iter().position(|s| s.handle == handle) else {
            return false;
        };
        subscribers.remove(index).active.store(false, Ordering::SeqCst);
        true
    }

    fn publish(&self, event: Event) -> Result<(), PublishError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PublishError::Closed);
        }

        lock(&self.published).push(event.clone());
        lock(&self.pending).push_back(event);

        loop {
            // A publish from inside a handler leaves delivery to the outer call.
            if self.dispatching.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
            self.drain();
            self.dispatching.store(false, Ordering::SeqCst);
            // Another thread may have queued an event after the last pop.
            if lock(&self.pending).is_empty() {
                return Ok(());
            }
        }
    }
}

/// No-op event bus that discards all events.
///
/// Useful for benchmarking or when events are not needed.
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn subscribe(&self, _query: SubscriptionQuery, _handler: EventHandler) -> SubscriptionHandle {
        SubscriptionHandle(0)
    }

    fn unsubscribe(&self, _handle: SubscriptionHandle) -> bool {
        false
    }

    fn publish(&self, _event: Event) -> Result<(), PublishError> {
        Ok(())
    }
}
