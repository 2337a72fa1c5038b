//! Observer lists for change notifications and cache removal events.
//!
//! Handlers are invoked synchronously on whichever task emits the event.
//! The handler list is copied out before invocation, so a handler may
//! subscribe or unsubscribe from inside its own callback, and a panicking
//! handler never aborts the operation that emitted the event.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Handle returned by [`EventHub::subscribe`], used to unsubscribe.
pub type SubscriptionId = u64;

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Ownership-clear list of event handlers.
pub struct EventHub<E> {
    label: &'static str,
    handlers: RwLock<Vec<(SubscriptionId, Handler<E>)>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl<E> EventHub<E> {
    /// `label` only shows up in log lines about failing handlers.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.write().push((id, Arc::new(handler)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Stop delivering events. Subscriptions are kept but never called again.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Deliver `event` to every current subscriber.
    ///
    /// Returns the number of handlers that panicked.
    pub fn emit(&self, event: &E) -> usize {
        if self.is_closed() {
            return 0;
        }

        // Release the lock before calling out
        let snapshot: Vec<Handler<E>> = self
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        let mut failures = 0;
        for handler in snapshot {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                failures += 1;
                log::error!(
                    "{} subscriber panicked: {}",
                    self.label,
                    panic_message(payload.as_ref())
                );
            }
        }
        failures
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
