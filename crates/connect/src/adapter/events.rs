//! Per-adapter listener registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::warn;
use serde::Serialize;
use unibridge_core::events::{AdapterEvent, AdapterEventSink};

/// Handle returned by [`AdapterEventHub::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubscriptionId(u64);

type Listener = (SubscriptionId, Arc<dyn AdapterEventSink>);

/// Fans adapter events out to subscribed sinks.
///
/// Emission copies the listener list before calling out, so a sink may
/// subscribe or unsubscribe from inside `emit` without deadlocking.
#[derive(Default)]
pub struct AdapterEventHub {
    next_id: AtomicU64,
    listeners: RwLock<Vec<Listener>>,
}

impl AdapterEventHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Listener>> {
        self.listeners.read().unwrap_or_else(|poisoned| {
            warn!("Adapter event listeners lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Listener>> {
        self.listeners.write().unwrap_or_else(|poisoned| {
            warn!("Adapter event listeners lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn subscribe(&self, sink: Arc<dyn AdapterEventSink>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write().push((id, sink));
        id
    }

    /// Removes a listener. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.read().len()
    }

    pub fn emit(&self, platform_id: &str, event: AdapterEvent) {
        let sinks: Vec<Arc<dyn AdapterEventSink>> =
            self.read().iter().map(|(_, sink)| sink.clone()).collect();
        for sink in sinks {
            sink.emit(platform_id, event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unibridge_core::events::MockAdapterEventSink;

    #[test]
    fn test_subscribers_receive_events_until_unsubscribed() {
        let hub = AdapterEventHub::new();
        let sink = MockAdapterEventSink::new();
        let id = hub.subscribe(Arc::new(sink.clone()));

        hub.emit("vinted", AdapterEvent::sync_error("first"));
        assert!(hub.unsubscribe(id));
        hub.emit("vinted", AdapterEvent::sync_error("second"));

        assert_eq!(sink.len(), 1);
        assert_eq!(hub.listener_count(), 0);
        assert!(!hub.unsubscribe(id));
    }

    #[test]
    fn test_each_subscription_gets_its_own_id() {
        let hub = AdapterEventHub::new();
        let a = hub.subscribe(Arc::new(MockAdapterEventSink::new()));
        let b = hub.subscribe(Arc::new(MockAdapterEventSink::new()));
        assert_ne!(a, b);
        assert_eq!(hub.listener_count(), 2);
    }
}
