//! Domain event types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::shipments::ShipmentStatus;

/// Events emitted by a platform adapter after its state has been persisted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdapterEvent {
    /// An inventory sync finished and every item in the batch was upserted.
    SyncComplete {
        items_synced: usize,
        created: usize,
        updated: usize,
        failed: usize,
        duration_ms: u64,
    },

    /// An inventory sync failed before completing.
    SyncError { message: String },

    /// A new order was stored (not emitted for redeliveries).
    OrderCreated {
        order_id: String,
        external_order_id: String,
        total_amount: Decimal,
        currency: String,
    },

    /// A shipment status changed.
    ShipmentUpdated {
        tracking_number: String,
        status: ShipmentStatus,
        order_id: Option<String>,
    },
}

impl AdapterEvent {
    /// Stable wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            AdapterEvent::SyncComplete { .. } => "sync_complete",
            AdapterEvent::SyncError { .. } => "sync_error",
            AdapterEvent::OrderCreated { .. } => "order_created",
            AdapterEvent::ShipmentUpdated { .. } => "shipment_updated",
        }
    }

    pub fn sync_complete(
        items_synced: usize,
        created: usize,
        updated: usize,
        failed: usize,
        duration_ms: u64,
    ) -> Self {
        Self::SyncComplete {
            items_synced,
            created,
            updated,
            failed,
            duration_ms,
        }
    }

    pub fn sync_error(message: impl Into<String>) -> Self {
        Self::SyncError {
            message: message.into(),
        }
    }

    pub fn order_created(
        order_id: impl Into<String>,
        external_order_id: impl Into<String>,
        total_amount: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self::OrderCreated {
            order_id: order_id.into(),
            external_order_id: external_order_id.into(),
            total_amount,
            currency: currency.into(),
        }
    }

    pub fn shipment_updated(
        tracking_number: impl Into<String>,
        status: ShipmentStatus,
        order_id: Option<String>,
    ) -> Self {
        Self::ShipmentUpdated {
            tracking_number: tracking_number.into(),
            status,
            order_id,
        }
    }
}

/// An adapter event re-emitted on the bridge-wide bus.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BridgeEvent {
    pub platform_id: String,
    pub event: AdapterEvent,
    pub emitted_at: DateTime<Utc>,
}

impl BridgeEvent {
    pub fn new(platform_id: impl Into<String>, event: AdapterEvent) -> Self {
        Self {
            platform_id: platform_id.into(),
            event,
            emitted_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.event.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = AdapterEvent::sync_error("boom");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "sync_error");
        assert_eq!(json["message"], "boom");
        assert_eq!(event.name(), "sync_error");
    }

    #[test]
    fn test_bridge_event_carries_platform() {
        let event = BridgeEvent::new(
            "maersk",
            AdapterEvent::shipment_updated("MSKU1", ShipmentStatus::Delivered, None),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["platformId"], "maersk");
        assert_eq!(json["event"]["status"], "delivered");
        assert_eq!(event.name(), "shipment_updated");
    }
}
