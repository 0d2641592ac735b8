use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use unibridge_core::events::BridgeEvent;

/// Published by the scheduler after each daily statistics rollup.
pub const STATS_ROLLUP: &str = "bridge:stats-rollup";
/// Published when a scheduled job fails or panics.
pub const JOB_FAILED: &str = "scheduler:job-failed";

/// Serializable envelope that carries event names and optional payloads.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    pub name: &'static str,
    pub payload: Option<Value>,
}

impl ServerEvent {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            payload: None,
        }
    }

    pub fn with_payload(name: &'static str, payload: Value) -> Self {
        Self {
            name,
            payload: Some(payload),
        }
    }
}

impl From<BridgeEvent> for ServerEvent {
    fn from(event: BridgeEvent) -> Self {
        let name = event.name();
        match serde_json::to_value(&event) {
            Ok(payload) => Self::with_payload(name, payload),
            Err(e) => {
                tracing::error!("Failed to serialize bridge event {}: {}", name, e);
                Self::new(name)
            }
        }
    }
}

/// Lightweight broadcast bus that fans out events to any connected clients.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ServerEvent) {
        // Lagging listeners are ignored to avoid blocking producers.
        let _ = self.sender.send(event);
    }
}

/// Copies every bridge event onto the server bus until the bridge closes.
pub fn spawn_bridge_forwarder(
    mut receiver: broadcast::Receiver<BridgeEvent>,
    bus: EventBus,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => bus.publish(event.into()),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event forwarder lagged, dropped {} bridge events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!("Bridge event forwarder stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use unibridge_core::events::AdapterEvent;

    #[tokio::test]
    async fn test_bridge_events_reach_the_bus() {
        let (sender, receiver) = broadcast::channel(8);
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let handle = spawn_bridge_forwarder(receiver, bus.clone());

        sender
            .send(BridgeEvent::new("vinted", AdapterEvent::sync_error("down")))
            .unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, "sync_error");
        assert_eq!(event.payload.unwrap()["platformId"], "vinted");

        drop(sender);
        handle.await.unwrap();
    }
}
