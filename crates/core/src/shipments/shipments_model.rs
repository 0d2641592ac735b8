//! Shipment domain models.

use std::fmt;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::ids;

/// Shared shipment status vocabulary. Carrier-native statuses are mapped
/// into this enum by each logistics adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Pending,
    PickedUp,
    InTransit,
    ArrivedAtPort,
    OutForDelivery,
    Delivered,
    Exception,
    Cancelled,
}

impl ShipmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::PickedUp => "picked_up",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::ArrivedAtPort => "arrived_at_port",
            ShipmentStatus::OutForDelivery => "out_for_delivery",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Exception => "exception",
            ShipmentStatus::Cancelled => "cancelled",
        }
    }

    /// No further status changes are accepted once one of these is reached.
    pub fn is_terminal(self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Cancelled)
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the append-only status history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentEvent {
    pub timestamp: DateTime<Utc>,
    pub status: ShipmentStatus,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentException {
    pub code: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// A status change reported by a carrier or an operator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentUpdate {
    pub status: ShipmentStatus,
    pub location: Option<String>,
    pub description: Option<String>,
    /// Time reported by the sender; defaults to receipt time.
    pub timestamp: Option<DateTime<Utc>>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub exception_code: Option<String>,
    pub exception_message: Option<String>,
}

impl ShipmentUpdate {
    pub fn new(status: ShipmentStatus) -> Self {
        Self {
            status,
            location: None,
            description: None,
            timestamp: None,
            estimated_delivery: None,
            exception_code: None,
            exception_message: None,
        }
    }

    pub fn at(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: String,
    pub platform: String,
    pub tracking_number: String,
    pub carrier: String,
    pub status: ShipmentStatus,
    pub current_location: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub history: Vec<ShipmentEvent>,
    pub exception: Option<ShipmentException>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    pub fn new(platform: &str, tracking_number: &str, carrier: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: ids::shipment_id(platform, tracking_number),
            platform: platform.to_string(),
            tracking_number: tracking_number.to_string(),
            carrier: carrier.to_string(),
            status: ShipmentStatus::Pending,
            current_location: None,
            estimated_delivery: None,
            history: Vec::new(),
            exception: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends a history entry and makes it the current status.
    ///
    /// Returns false and leaves the shipment untouched when the update repeats
    /// any entry already in the history (a redelivered webhook), or when the
    /// shipment already reached a terminal status.
    pub fn record(&mut self, update: ShipmentUpdate, now: DateTime<Utc>) -> bool {
        let timestamp = update.timestamp.unwrap_or(now);
        let entry = ShipmentEvent {
            timestamp,
            status: update.status,
            location: update.location.clone(),
            description: update.description.clone(),
        };

        let repeated = self.history.iter().any(|seen| {
            seen.status == entry.status
                && seen.location == entry.location
                && seen.description == entry.description
                && (update.timestamp.is_none() || seen.timestamp == entry.timestamp)
        });
        if repeated {
            return false;
        }
        if self.status.is_terminal() {
            info!(
                "Shipment {} is {}, ignoring late {} update",
                self.tracking_number,
                self.status,
                entry.status
            );
            return false;
        }

        self.status = entry.status;
        if entry.location.is_some() {
            self.current_location = entry.location.clone();
        }
        if update.estimated_delivery.is_some() {
            self.estimated_delivery = update.estimated_delivery;
        }
        if update.status == ShipmentStatus::Exception {
            self.exception = Some(ShipmentException {
                code: update
                    .exception_code
                    .unwrap_or_else(|| "UNKNOWN".to_string()),
                message: update
                    .exception_message
                    .or(update.description)
                    .unwrap_or_default(),
                timestamp,
            });
        }
        self.history.push(entry);
        self.updated_at = now;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_status_tracks_last_history_entry() {
        let now = Utc::now();
        let mut shipment = Shipment::new("maersk", "MSKU1234567", "Maersk", now);

        let steps = [
            ShipmentStatus::PickedUp,
            ShipmentStatus::InTransit,
            ShipmentStatus::ArrivedAtPort,
            ShipmentStatus::Delivered,
        ];
        for status in steps {
            assert!(shipment.record(ShipmentUpdate::new(status), Utc::now()));
            assert_eq!(
                shipment.status,
                shipment.history.last().map(|e| e.status).unwrap()
            );
        }
        assert_eq!(shipment.history.len(), 4);
    }

    #[test]
    fn test_redelivered_update_is_not_appended() {
        let now = Utc::now();
        let mut shipment = Shipment::new("maersk", "MSKU1234567", "Maersk", now);
        let update = ShipmentUpdate::new(ShipmentStatus::InTransit)
            .at(Some("Valencia".to_string()))
            .described("Departed");

        assert!(shipment.record(update.clone(), now));
        assert!(!shipment.record(update, now));
        assert_eq!(shipment.history.len(), 1);
    }

    #[test]
    fn test_late_earlier_event_does_not_reopen_delivery() {
        let now = Utc::now();
        let mut shipment = Shipment::new("maersk", "MSKU1234567", "Maersk", now);
        let departed = ShipmentUpdate::new(ShipmentStatus::InTransit)
            .at(Some("Valencia".to_string()))
            .described("Departed");

        assert!(shipment.record(departed.clone(), now));
        assert!(shipment.record(ShipmentUpdate::new(ShipmentStatus::Delivered), now));
        assert!(!shipment.record(departed, now));
        assert!(!shipment.record(ShipmentUpdate::new(ShipmentStatus::InTransit), now));

        assert_eq!(shipment.status, ShipmentStatus::Delivered);
        assert_eq!(shipment.history.len(), 2);
    }

    #[test]
    fn test_exception_is_recorded() {
        let now = Utc::now();
        let mut shipment = Shipment::new("maersk", "MSKU1", "Maersk", now);
        let mut update = ShipmentUpdate::new(ShipmentStatus::Exception);
        update.exception_code = Some("CUSTOMS_HOLD".to_string());
        update.exception_message = Some("Held at customs".to_string());

        shipment.record(update, now);
        let exception = shipment.exception.expect("exception recorded");
        assert_eq!(exception.code, "CUSTOMS_HOLD");
        assert_eq!(exception.message, "Held at customs");
    }
}
