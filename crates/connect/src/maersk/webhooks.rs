//! Maersk shipment webhooks.

use chrono::{DateTime, Utc};
use log::warn;
use serde::Deserialize;
use serde_json::Value;
use unibridge_core::errors::Result;
use unibridge_core::shipments::{ShipmentStatus, ShipmentUpdate};

use super::status::parse_status;
use super::MaerskAdapter;
use crate::adapter::{parse_payload, WebhookOutcome};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShipmentWebhook {
    #[serde(alias = "containerNumber", alias = "billOfLading")]
    tracking_number: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default, alias = "estimatedArrival")]
    estimated_delivery: Option<DateTime<Utc>>,
    #[serde(default)]
    exception_code: Option<String>,
    #[serde(default, alias = "message")]
    exception_message: Option<String>,
}

impl ShipmentWebhook {
    fn into_update(self, status: ShipmentStatus) -> (String, ShipmentUpdate) {
        let update = ShipmentUpdate {
            status,
            location: self.location,
            description: self.description.or(self.status),
            timestamp: self.timestamp,
            estimated_delivery: self.estimated_delivery,
            exception_code: self.exception_code,
            exception_message: self.exception_message,
        };
        (self.tracking_number, update)
    }
}

impl MaerskAdapter {
    async fn apply_webhook(
        &self,
        tracking_number: String,
        update: ShipmentUpdate,
    ) -> Result<WebhookOutcome> {
        let shipment = self.record(&tracking_number, update).await?;
        Ok(WebhookOutcome::processed()
            .with_tracking_number(tracking_number)
            .with_status(shipment.status.as_str()))
    }

    pub(super) async fn handle_status_changed(&self, payload: Value) -> Result<WebhookOutcome> {
        let event: ShipmentWebhook = parse_payload("shipment.status.changed", payload)?;
        let Some(status) = event.status.as_deref().map(parse_status) else {
            warn!(
                "[maersk] status change for {} without a status",
                event.tracking_number
            );
            return Ok(WebhookOutcome::ignored("Missing status"));
        };
        let (tracking_number, update) = event.into_update(status);
        self.apply_webhook(tracking_number, update).await
    }

    pub(super) async fn handle_milestone(
        &self,
        event_type: &str,
        payload: Value,
        status: ShipmentStatus,
    ) -> Result<WebhookOutcome> {
        let event: ShipmentWebhook = parse_payload(event_type, payload)?;
        let (tracking_number, update) = event.into_update(status);
        self.apply_webhook(tracking_number, update).await
    }

    pub(super) async fn handle_exception(&self, payload: Value) -> Result<WebhookOutcome> {
        let event: ShipmentWebhook = parse_payload("shipment.exception", payload)?;
        warn!(
            "[maersk] exception on {}: {}",
            event.tracking_number,
            event.exception_message.as_deref().unwrap_or("no details")
        );
        let (tracking_number, update) = event.into_update(ShipmentStatus::Exception);
        self.apply_webhook(tracking_number, update).await
    }
}
