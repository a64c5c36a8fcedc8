//! Connection lifecycle notifications
//!
//! The server loop publishes connect/disconnect events on a
//! [`ConnectionHub`]. Components that react to membership hold a
//! [`Subscription`]; dropping it unsubscribes, so a subscriber can never
//! outlive its registration or leave a dangling one behind.

use log::debug;
use shared::ConnectionId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected(ConnectionId),
    Disconnected(ConnectionId),
}

#[derive(Default)]
struct HubInner {
    next_subscription: u64,
    subscribers: HashMap<u64, mpsc::UnboundedSender<ConnectionEvent>>,
}

/// Fan-out of connection events to every live subscription
#[derive(Clone, Default)]
pub struct ConnectionHub {
    inner: Arc<Mutex<HubInner>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber; events published from now on are queued for it
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();

        let id = inner.next_subscription;
        inner.next_subscription += 1;
        inner.subscribers.insert(id, tx);
        debug!("Lifecycle subscription {} registered", id);

        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
            events: rx,
        }
    }

    /// Delivers `event` to every subscriber
    pub fn notify(&self, event: ConnectionEvent) {
        let mut inner = self.lock();
        inner
            .subscribers
            .retain(|_, subscriber| subscriber.send(event).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Scoped registration on a [`ConnectionHub`]
pub struct Subscription {
    id: u64,
    hub: Weak<Mutex<HubInner>>,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
}

impl Subscription {
    /// Next queued event, if any
    pub fn try_next(&mut self) -> Option<ConnectionEvent> {
        self.events.try_recv().ok()
    }

    /// All queued events in publication order
    pub fn drain(&mut self) -> Vec<ConnectionEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            let mut inner = inner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            inner.subscribers.remove(&self.id);
            debug!("Lifecycle subscription {} released", self.id);
        }
    }
}
