//! Inputs and results of adapter operations.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unibridge_core::orders::Order;
use unibridge_core::shipments::ShipmentStatus;

use super::state::{AdapterStats, AdapterStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlatformCategory {
    Marketplace,
    Logistics,
    Rental,
}

impl fmt::Display for PlatformCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformCategory::Marketplace => write!(f, "marketplace"),
            PlatformCategory::Logistics => write!(f, "logistics"),
            PlatformCategory::Rental => write!(f, "rental"),
        }
    }
}

/// Whether an adapter talks to the real platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    Live,
    Mock,
}

/// Structured "this platform does not do that" answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotApplicable {
    /// True when skipping the operation is the correct, complete result
    /// (a carrier has no inventory); false when the caller asked for
    /// something the platform refuses.
    pub success: bool,
    pub message: String,
}

/// Result of an operation that may not apply to every platform.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Outcome<T> {
    Done(T),
    NotApplicable(NotApplicable),
}

impl<T> Outcome<T> {
    pub fn not_applicable(success: bool, message: impl Into<String>) -> Self {
        Outcome::NotApplicable(NotApplicable {
            success,
            message: message.into(),
        })
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    /// Whether the caller should treat the outcome as a success.
    pub fn is_success(&self) -> bool {
        match self {
            Outcome::Done(_) => true,
            Outcome::NotApplicable(na) => na.success,
        }
    }

    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            Outcome::NotApplicable(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncOptions {
    /// Maximum number of source items to pull.
    pub limit: Option<usize>,
}

impl SyncOptions {
    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }

    /// Requested limit, or `default`, capped at `max`.
    pub fn effective_limit(&self, default: usize, max: usize) -> usize {
        self.limit.unwrap_or(default).min(max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub external_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub mode: ConnectionMode,
    pub items_processed: usize,
    pub items_saved: usize,
    pub created: usize,
    pub updated: usize,
    pub failures: Vec<ItemFailure>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PushItemResult {
    pub item_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PushItemResult {
    pub fn pushed(item_id: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            success: true,
            external_id: Some(external_id.into()),
            error: None,
        }
    }

    pub fn failed(item_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            success: false,
            external_id: None,
            error: Some(error.into()),
        }
    }
}

/// Result of handling one webhook delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOutcome {
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_amount: Option<Decimal>,
    /// Set on terminal payout events; downstream revenue distribution keys
    /// off this flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_for_distribution: Option<bool>,
}

impl WebhookOutcome {
    pub fn processed() -> Self {
        Self {
            processed: true,
            ..Default::default()
        }
    }

    pub fn ignored(reason: impl Into<String>) -> Self {
        Self {
            processed: false,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn unknown_event() -> Self {
        Self::ignored("Unknown event type")
    }

    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_tracking_number(mut self, tracking_number: impl Into<String>) -> Self {
        self.tracking_number = Some(tracking_number.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orders & logistics
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PartyDraft {
    pub external_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineDraft {
    pub external_id: String,
    pub title: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub price: Decimal,
}

fn default_quantity() -> u32 {
    1
}

/// Operator-submitted order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderDraft {
    pub external_order_id: Option<String>,
    pub buyer: Option<PartyDraft>,
    pub seller: Option<PartyDraft>,
    pub items: Vec<OrderLineDraft>,
    pub total_amount: Option<Decimal>,
    pub shipping_cost: Decimal,
    pub currency: Option<String>,
    pub shipping_address: Option<Value>,
    /// Present when the order is a freight booking.
    pub booking: Option<BookingRequest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingRequest {
    /// UN/LOCODE of the origin port.
    pub origin: String,
    pub destination: String,
    pub container_type: Option<String>,
    pub commodity: Option<String>,
    pub weight_kg: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub booking_number: String,
    pub status: String,
    pub origin: String,
    pub destination: String,
    pub container_type: String,
    pub estimated_departure: DateTime<Utc>,
    pub estimated_arrival: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// What `create_order` produced.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CreatedOrder {
    Order(Box<Order>),
    Booking(Booking),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub code: String,
    pub name: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub timestamp: DateTime<Utc>,
    /// Carrier-native status text.
    pub native_status: String,
    pub status: ShipmentStatus,
    pub location: Option<String>,
}

/// Current position and history of a tracked container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSnapshot {
    pub tracking_number: String,
    pub carrier: String,
    pub status: ShipmentStatus,
    pub vessel: Option<String>,
    pub voyage_number: Option<String>,
    pub origin: Option<Port>,
    pub destination: Option<Port>,
    pub current_location: Option<String>,
    pub estimated_arrival: Option<DateTime<Utc>>,
    pub container_type: Option<String>,
    pub events: Vec<TrackingEvent>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Introspection
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub platform_id: String,
    pub healthy: bool,
    pub status: AdapterStatus,
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdapterInfo {
    pub platform_id: String,
    pub name: String,
    pub category: PlatformCategory,
    pub status: AdapterStatus,
    pub sync_in_progress: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub stats: AdapterStats,
}
