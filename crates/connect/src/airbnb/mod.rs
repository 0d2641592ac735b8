//! Airbnb short-term rental adapter.
//!
//! Inbound only: listings and reservations flow into the bridge, nothing is
//! created on Airbnb.

mod mapping;
mod webhooks;

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use serde_json::Value;
use unibridge_core::constants::PLATFORM_AIRBNB;
use unibridge_core::errors::{Error, Result};
use unibridge_core::items::SyncedItem;
use unibridge_core::shipments::{Shipment, ShipmentUpdate};

use crate::adapter::{
    parse_payload, run_inventory_sync, AdapterContext, AdapterState, AdapterStatus,
    ConnectionMode, CreatedOrder, FetchedItem, OrderDraft, Outcome, PlatformAdapter,
    PlatformCategory, PushItemResult, SyncOptions, SyncReport, WebhookHeaders, WebhookOutcome,
};
use crate::client::{HttpPlatformClient, PlatformHttpClient};
use crate::config::AdapterConfig;
use crate::signature::WebhookVerifier;

pub use mapping::{
    calculate_nights, generate_mock_listings, AirbnbListing, ListingPhoto, ListingPrice,
    LISTING_CATEGORY,
};

pub const DEFAULT_BASE_URL: &str = "https://api.airbnb.com/v2";
pub const CREDENTIAL_KEYS: &[&str] = &["client_id", "client_secret"];
const DEFAULT_SYNC_LIMIT: usize = 10;
/// Upper bound on items pulled by one sync, mock or live.
const MAX_SYNC_LIMIT: usize = 100;

pub struct AirbnbAdapter {
    state: AdapterState,
    context: AdapterContext,
    verifier: WebhookVerifier,
    client: Option<Arc<dyn PlatformHttpClient>>,
}

impl AirbnbAdapter {
    pub fn new(config: AdapterConfig, context: AdapterContext) -> Result<Self> {
        let client = match (
            config.credential("client_id"),
            config.credential("client_secret"),
        ) {
            (Some(_), Some(secret)) => {
                let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
                let client = HttpPlatformClient::new(
                    PLATFORM_AIRBNB,
                    base_url,
                    Some(secret),
                    config.timeout(),
                )?;
                Some(Arc::new(client) as Arc<dyn PlatformHttpClient>)
            }
            _ => None,
        };
        Ok(Self {
            state: AdapterState::new(PLATFORM_AIRBNB, config.requests_per_minute),
            verifier: WebhookVerifier::new(PLATFORM_AIRBNB, &config),
            context,
            client,
        })
    }

    pub fn with_client(mut self, client: Arc<dyn PlatformHttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    fn mode(&self) -> ConnectionMode {
        match &self.client {
            Some(_) if !self.state.is_mock() => ConnectionMode::Live,
            _ => ConnectionMode::Mock,
        }
    }

    async fn fetch_listings(&self, mode: ConnectionMode, limit: usize) -> Result<Vec<FetchedItem>> {
        let client = match (&self.client, mode) {
            (Some(client), ConnectionMode::Live) => client,
            _ => {
                return Ok(generate_mock_listings(limit)
                    .into_iter()
                    .map(|listing| FetchedItem {
                        external_id: listing.id.clone(),
                        item: Ok(mapping::to_internal(listing)),
                    })
                    .collect())
            }
        };

        self.state.acquire_request_slot()?;
        let response = client
            .get_json("/listings", &[("_limit", limit.to_string())])
            .await?;
        let raw = match response.get("listings") {
            Some(Value::Array(listings)) => listings.clone(),
            _ => Vec::new(),
        };
        Ok(raw
            .into_iter()
            .map(|raw| {
                let external_id = raw
                    .get("id")
                    .map(|id| id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string()))
                    .unwrap_or_default();
                let item =
                    parse_payload::<AirbnbListing>("airbnb listing", raw).map(mapping::to_internal);
                FetchedItem { external_id, item }
            })
            .collect())
    }
}

#[async_trait]
impl PlatformAdapter for AirbnbAdapter {
    fn platform_id(&self) -> &'static str {
        PLATFORM_AIRBNB
    }

    fn name(&self) -> &'static str {
        "Airbnb"
    }

    fn category(&self) -> PlatformCategory {
        PlatformCategory::Rental
    }

    fn state(&self) -> &AdapterState {
        &self.state
    }

    async fn connect(&self) -> Result<ConnectionMode> {
        if self.client.is_none() {
            warn!("[airbnb] no API credentials configured, running in mock mode");
            self.state.set_status(AdapterStatus::ConnectedMock);
            return Ok(ConnectionMode::Mock);
        }
        self.state.set_status(AdapterStatus::Connected);
        info!("[airbnb] connected");
        Ok(ConnectionMode::Live)
    }

    async fn sync_inventory(&self, options: SyncOptions) -> Result<Outcome<SyncReport>> {
        let mode = self.mode();
        let limit = options.effective_limit(DEFAULT_SYNC_LIMIT, MAX_SYNC_LIMIT);
        let report = run_inventory_sync(
            &self.state,
            self.context.items.as_ref(),
            mode,
            self.fetch_listings(mode, limit),
        )
        .await?;
        Ok(Outcome::Done(report))
    }

    async fn push_inventory(
        &self,
        _items: Vec<SyncedItem>,
    ) -> Result<Outcome<Vec<PushItemResult>>> {
        warn!("[airbnb] listing creation through the API is restricted");
        Ok(Outcome::not_applicable(
            false,
            "Airbnb listings must be created on airbnb.com",
        ))
    }

    async fn create_order(&self, _draft: OrderDraft) -> Result<Outcome<CreatedOrder>> {
        Ok(Outcome::not_applicable(
            false,
            "Reservations must be made on airbnb.com",
        ))
    }

    async fn update_shipment(
        &self,
        _tracking_number: &str,
        _update: ShipmentUpdate,
    ) -> Result<Outcome<Shipment>> {
        Ok(Outcome::not_applicable(
            false,
            "Not applicable for accommodation",
        ))
    }

    async fn handle_webhook(&self, event_type: &str, payload: Value) -> Result<WebhookOutcome> {
        info!("[airbnb] webhook {}", event_type);
        let result = match event_type {
            "reservation.created" => self.handle_reservation_created(payload).await,
            "reservation.confirmed" => self.handle_reservation_confirmed(payload).await,
            "reservation.cancelled" => self.handle_reservation_cancelled(payload).await,
            "payout.completed" => self.handle_payout_completed(payload),
            _ => {
                warn!("[airbnb] unhandled webhook event type: {}", event_type);
                Ok(WebhookOutcome::unknown_event())
            }
        };
        self.state.record_result(&result);
        result
    }

    fn transform_to_internal(&self, external: &Value) -> Result<Value> {
        let listing: AirbnbListing = parse_payload("airbnb listing", external.clone())?;
        serde_json::to_value(mapping::to_internal(listing)).map_err(Error::from)
    }

    /// Airbnb accepts no listings from outside, so there is no native
    /// shape to map into.
    fn transform_to_external(&self, internal: &Value) -> Result<Value> {
        Ok(internal.clone())
    }

    fn validate_webhook_signature(&self, headers: &WebhookHeaders, raw_body: &[u8]) -> bool {
        self.verifier.verify(headers, raw_body)
    }
}
