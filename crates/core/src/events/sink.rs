//! Adapter event sink trait and implementations.

use std::sync::{Arc, Mutex};

use super::AdapterEvent;

/// Trait for receiving adapter events.
///
/// # Design Rules
///
/// - `emit()` must be fast and non-blocking (no network calls, no DB writes)
/// - Failure to emit must not affect the adapter operation that produced it
pub trait AdapterEventSink: Send + Sync {
    fn emit(&self, platform_id: &str, event: AdapterEvent);
}

/// Mock sink for testing - collects emitted events.
#[derive(Clone, Default)]
pub struct MockAdapterEventSink {
    events: Arc<Mutex<Vec<(String, AdapterEvent)>>>,
}

impl MockAdapterEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    pub fn events(&self) -> Vec<(String, AdapterEvent)> {
        self.events.lock().unwrap().clone()
    }

    /// Names of the collected events, in emission order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, event)| event.name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }
}

impl AdapterEventSink for MockAdapterEventSink {
    fn emit(&self, platform_id: &str, event: AdapterEvent) {
        self.events
            .lock()
            .unwrap()
            .push((platform_id.to_string(), event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_sink_collects_events() {
        let sink = MockAdapterEventSink::new();
        assert!(sink.is_empty());

        sink.emit("vinted", AdapterEvent::sync_complete(3, 3, 0, 0, 12));
        sink.emit("vinted", AdapterEvent::sync_error("timeout"));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.names(), vec!["sync_complete", "sync_error"]);
        assert_eq!(sink.events()[0].0, "vinted");
    }
}
