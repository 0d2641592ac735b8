//! Maersk ocean freight adapter.
//!
//! A carrier has no inventory and takes no marketplace orders: sync and push
//! report success without doing anything, and `create_order` books freight.

mod status;
mod tracking;
mod webhooks;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unibridge_core::constants::PLATFORM_MAERSK;
use unibridge_core::errors::{Error, Result, ValidationError};
use unibridge_core::events::AdapterEvent;
use unibridge_core::items::SyncedItem;
use unibridge_core::shipments::{Shipment, ShipmentStatus, ShipmentUpdate};

use crate::adapter::{
    parse_payload, AdapterContext, AdapterState, AdapterStatus, Booking, BookingRequest,
    ConnectionMode, CreatedOrder, OrderDraft, Outcome, PlatformAdapter, PlatformCategory,
    PushItemResult, SyncOptions, SyncReport, TrackingSnapshot, WebhookHeaders, WebhookOutcome,
};
use crate::client::{HttpPlatformClient, PlatformHttpClient};
use crate::config::AdapterConfig;
use crate::signature::WebhookVerifier;

pub use status::{map_status, parse_status, reverse_map_status, STATUS_TABLE};
pub use tracking::{
    MaerskBookingResponse, MaerskEvent, MaerskTrackingResponse, CARRIER_NAME,
    DEFAULT_CONTAINER_TYPE,
};

pub const DEFAULT_BASE_URL: &str = "https://api.maersk.com";
pub const CREDENTIAL_KEYS: &[&str] = &["consumer_key", "consumer_secret"];
const NOT_APPLICABLE_FOR_CARRIER: &str = "Not applicable for logistics provider";

/// A carrier event in its native shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NativeShipmentEvent {
    #[serde(alias = "eventType")]
    pub status: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "eventDateTime")]
    pub timestamp: Option<chrono::DateTime<Utc>>,
}

pub struct MaerskAdapter {
    state: AdapterState,
    context: AdapterContext,
    verifier: WebhookVerifier,
    client: Option<Arc<dyn PlatformHttpClient>>,
}

impl MaerskAdapter {
    pub fn new(config: AdapterConfig, context: AdapterContext) -> Result<Self> {
        let client = match config.credential("consumer_key") {
            Some(key) => {
                let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
                let client =
                    HttpPlatformClient::new(PLATFORM_MAERSK, base_url, Some(key), config.timeout())?;
                Some(Arc::new(client) as Arc<dyn PlatformHttpClient>)
            }
            None => None,
        };
        Ok(Self {
            state: AdapterState::new(PLATFORM_MAERSK, config.requests_per_minute),
            verifier: WebhookVerifier::new(PLATFORM_MAERSK, &config),
            context,
            client,
        })
    }

    pub fn with_client(mut self, client: Arc<dyn PlatformHttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// The HTTP client, or `None` in mock mode.
    fn live_client(&self) -> Option<&Arc<dyn PlatformHttpClient>> {
        self.client.as_ref().filter(|_| !self.state.is_mock())
    }

    async fn fetch_tracking(&self, tracking_number: &str) -> Result<TrackingSnapshot> {
        let Some(client) = self.live_client() else {
            return Ok(tracking::mock_tracking(tracking_number, Utc::now()));
        };
        self.state.acquire_request_slot()?;
        let response = client
            .get_json(&format!("/track/{}", tracking_number), &[])
            .await?;
        let response: MaerskTrackingResponse = parse_payload("maersk tracking", response)?;
        Ok(tracking::to_snapshot(tracking_number, response))
    }

    async fn book(&self, request: &BookingRequest) -> Result<Booking> {
        if request.origin.trim().is_empty() {
            return Err(ValidationError::MissingField("origin".to_string()).into());
        }
        if request.destination.trim().is_empty() {
            return Err(ValidationError::MissingField("destination".to_string()).into());
        }
        let now = Utc::now();
        let Some(client) = self.live_client() else {
            return Ok(tracking::mock_booking(request, now));
        };
        self.state.acquire_request_slot()?;
        let response = client
            .post_json("/bookings", &serde_json::to_value(request)?)
            .await?;
        let response: MaerskBookingResponse = parse_payload("maersk booking", response)?;
        Ok(tracking::to_booking(request, response, now))
    }

    /// Appends a status change to the shipment and announces it. Redeliveries
    /// and late events leave the shipment alone and are not announced.
    async fn record(&self, tracking_number: &str, update: ShipmentUpdate) -> Result<Shipment> {
        let upserted = self
            .context
            .shipments
            .record_shipment_update(PLATFORM_MAERSK, tracking_number, CARRIER_NAME, update)
            .await?;
        if upserted.changed {
            self.state.emit(AdapterEvent::shipment_updated(
                tracking_number,
                upserted.record.status,
                None,
            ));
        }
        Ok(upserted.record)
    }
}

#[async_trait]
impl PlatformAdapter for MaerskAdapter {
    fn platform_id(&self) -> &'static str {
        PLATFORM_MAERSK
    }

    fn name(&self) -> &'static str {
        "Maersk"
    }

    fn category(&self) -> PlatformCategory {
        PlatformCategory::Logistics
    }

    fn state(&self) -> &AdapterState {
        &self.state
    }

    async fn connect(&self) -> Result<ConnectionMode> {
        if self.client.is_none() {
            warn!("[maersk] no consumer key configured, running in mock mode");
            self.state.set_status(AdapterStatus::ConnectedMock);
            return Ok(ConnectionMode::Mock);
        }
        self.state.set_status(AdapterStatus::Connected);
        info!("[maersk] connected");
        Ok(ConnectionMode::Live)
    }

    async fn sync_inventory(&self, _options: SyncOptions) -> Result<Outcome<SyncReport>> {
        Ok(Outcome::not_applicable(true, NOT_APPLICABLE_FOR_CARRIER))
    }

    async fn push_inventory(
        &self,
        _items: Vec<SyncedItem>,
    ) -> Result<Outcome<Vec<PushItemResult>>> {
        Ok(Outcome::not_applicable(true, NOT_APPLICABLE_FOR_CARRIER))
    }

    async fn create_order(&self, draft: OrderDraft) -> Result<Outcome<CreatedOrder>> {
        let request = draft
            .booking
            .ok_or_else(|| ValidationError::MissingField("booking".to_string()))?;
        let booking = self.book(&request).await;
        self.state.record_result(&booking);
        Ok(Outcome::Done(CreatedOrder::Booking(booking?)))
    }

    async fn update_shipment(
        &self,
        tracking_number: &str,
        update: ShipmentUpdate,
    ) -> Result<Outcome<Shipment>> {
        if tracking_number.trim().is_empty() {
            return Err(ValidationError::MissingField("trackingNumber".to_string()).into());
        }
        info!(
            "[maersk] shipment {} -> {}",
            tracking_number, update.status
        );
        Ok(Outcome::Done(self.record(tracking_number, update).await?))
    }

    async fn handle_webhook(&self, event_type: &str, payload: Value) -> Result<WebhookOutcome> {
        info!("[maersk] webhook {}", event_type);
        let result = match event_type {
            "shipment.status.changed" => self.handle_status_changed(payload).await,
            "shipment.departed" => {
                self.handle_milestone(event_type, payload, ShipmentStatus::InTransit)
                    .await
            }
            "shipment.arrived" => {
                self.handle_milestone(event_type, payload, ShipmentStatus::ArrivedAtPort)
                    .await
            }
            "shipment.delivered" => {
                self.handle_milestone(event_type, payload, ShipmentStatus::Delivered)
                    .await
            }
            "shipment.exception" => self.handle_exception(payload).await,
            _ => {
                warn!("[maersk] unhandled webhook event type: {}", event_type);
                Ok(WebhookOutcome::unknown_event())
            }
        };
        self.state.record_result(&result);
        result
    }

    async fn track_shipment(&self, tracking_number: &str) -> Result<Outcome<TrackingSnapshot>> {
        let snapshot = self.fetch_tracking(tracking_number).await;
        self.state.record_result(&snapshot);
        Ok(Outcome::Done(snapshot?))
    }

    async fn create_booking(&self, request: BookingRequest) -> Result<Outcome<Booking>> {
        let booking = self.book(&request).await;
        self.state.record_result(&booking);
        let booking = booking?;
        info!(
            "[maersk] booked {} ({} -> {})",
            booking.booking_number, booking.origin, booking.destination
        );
        Ok(Outcome::Done(booking))
    }

    /// Native carrier event to a canonical shipment update.
    fn transform_to_internal(&self, external: &Value) -> Result<Value> {
        let event: NativeShipmentEvent = parse_payload("maersk event", external.clone())?;
        let mut update = ShipmentUpdate::new(map_status(&event.status))
            .at(event.location)
            .described(event.status);
        update.timestamp = event.timestamp;
        Ok(serde_json::to_value(update)?)
    }

    fn transform_to_external(&self, internal: &Value) -> Result<Value> {
        let update: ShipmentUpdate = parse_payload("shipment update", internal.clone())?;
        let event = NativeShipmentEvent {
            status: reverse_map_status(update.status).to_string(),
            location: update.location,
            timestamp: update.timestamp,
        };
        serde_json::to_value(event).map_err(Error::from)
    }

    fn validate_webhook_signature(&self, headers: &WebhookHeaders, raw_body: &[u8]) -> bool {
        self.verifier.verify(headers, raw_body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn adapter() -> MaerskAdapter {
        MaerskAdapter::new(AdapterConfig::default(), AdapterContext::in_memory()).unwrap()
    }

    #[tokio::test]
    async fn test_inventory_is_not_applicable_but_successful() {
        let adapter = adapter();
        let sync = adapter.sync_inventory(SyncOptions::default()).await.unwrap();
        assert!(!sync.is_applicable());
        assert!(sync.is_success());
        let push = adapter.push_inventory(vec![]).await.unwrap();
        assert!(push.is_success());
        assert!(!adapter.state().is_syncing());
    }

    #[tokio::test]
    async fn test_mock_tracking_and_booking() {
        let adapter = adapter();
        adapter.connect().await.unwrap();

        let snapshot = adapter
            .track_shipment("MSKU1234567")
            .await
            .unwrap()
            .done()
            .unwrap();
        assert_eq!(snapshot.tracking_number, "MSKU1234567");

        let booking = adapter
            .create_booking(BookingRequest {
                origin: "ESVLC".to_string(),
                destination: "CNSHA".to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
            .done()
            .unwrap();
        assert!(booking.booking_number.starts_with("MAEU"));
    }

    #[tokio::test]
    async fn test_create_order_books_freight() {
        let adapter = adapter();
        let draft = OrderDraft {
            booking: Some(BookingRequest {
                origin: "ESVLC".to_string(),
                destination: "USNYC".to_string(),
                container_type: Some("20GP".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let created = adapter.create_order(draft).await.unwrap().done().unwrap();
        assert!(matches!(
            created,
            CreatedOrder::Booking(Booking { ref container_type, .. }) if container_type == "20GP"
        ));

        assert!(adapter.create_order(OrderDraft::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_booking_requires_ports() {
        let err = adapter()
            .create_booking(BookingRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_shipment_records_history() {
        let context = AdapterContext::in_memory();
        let adapter = MaerskAdapter::new(AdapterConfig::default(), context.clone()).unwrap();

        adapter
            .update_shipment("MSKU1", ShipmentUpdate::new(ShipmentStatus::PickedUp))
            .await
            .unwrap();
        let shipment = adapter
            .update_shipment("MSKU1", ShipmentUpdate::new(ShipmentStatus::InTransit))
            .await
            .unwrap()
            .done()
            .unwrap();

        assert_eq!(shipment.status, ShipmentStatus::InTransit);
        assert_eq!(shipment.history.len(), 2);
        assert_eq!(context.shipments.count_shipments(Some("maersk")).unwrap(), 1);
    }

    #[test]
    fn test_transforms_use_status_table() {
        let adapter = adapter();
        let internal = adapter
            .transform_to_internal(&json!({"eventType": "Discharged", "location": "Rotterdam"}))
            .unwrap();
        assert_eq!(internal["status"], "out_for_delivery");
        assert_eq!(internal["location"], "Rotterdam");

        let external = adapter
            .transform_to_external(&json!({"status": "arrived_at_port"}))
            .unwrap();
        assert_eq!(external["status"], "Arrived");
    }
}
