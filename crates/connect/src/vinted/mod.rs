//! Vinted second-hand marketplace adapter.

mod mapping;
mod mock;
mod webhooks;

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use serde_json::Value;
use unibridge_core::constants::PLATFORM_VINTED;
use unibridge_core::errors::{Error, Result, ValidationError};
use unibridge_core::items::{NewSyncedItem, SyncedItem};
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
    map_category, map_condition, reverse_map_category, reverse_map_condition, VintedItem,
    VintedListing, VintedPhoto,
};
pub use mock::generate_mock_items;

pub const DEFAULT_BASE_URL: &str = "https://api.vinted.com/v1";
pub const CREDENTIAL_KEYS: &[&str] = &["access_token", "api_key", "user_id"];
const DEFAULT_SYNC_LIMIT: usize = 20;
/// Upper bound on items pulled by one sync, mock or live.
const MAX_SYNC_LIMIT: usize = 100;

pub struct VintedAdapter {
    config: AdapterConfig,
    state: AdapterState,
    context: AdapterContext,
    verifier: WebhookVerifier,
    client: Option<Arc<dyn PlatformHttpClient>>,
}

impl VintedAdapter {
    /// Builds the adapter. An HTTP client is only created when credentials
    /// are present; otherwise the adapter runs in mock mode.
    pub fn new(config: AdapterConfig, context: AdapterContext) -> Result<Self> {
        let token = config
            .credential("access_token")
            .or_else(|| config.credential("api_key"));
        let client = match token {
            Some(token) => {
                let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
                let client =
                    HttpPlatformClient::new(PLATFORM_VINTED, base_url, Some(token), config.timeout())?;
                Some(Arc::new(client) as Arc<dyn PlatformHttpClient>)
            }
            None => None,
        };
        Ok(Self {
            state: AdapterState::new(PLATFORM_VINTED, config.requests_per_minute),
            verifier: WebhookVerifier::new(PLATFORM_VINTED, &config),
            config,
            context,
            client,
        })
    }

    /// Replaces the HTTP client, switching the adapter to live mode.
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

    fn live_client(&self) -> Result<&Arc<dyn PlatformHttpClient>> {
        self.client
            .as_ref()
            .ok_or_else(|| Error::Unexpected("vinted adapter has no HTTP client".to_string()))
    }

    async fn fetch_items(&self, mode: ConnectionMode, limit: usize) -> Result<Vec<FetchedItem>> {
        if mode == ConnectionMode::Mock {
            return Ok(generate_mock_items(limit)
                .into_iter()
                .map(|item| FetchedItem {
                    external_id: item.id.clone(),
                    item: Ok(mapping::to_internal(item)),
                })
                .collect());
        }

        let user_id = self
            .config
            .credential("user_id")
            .ok_or_else(|| ValidationError::MissingField("user_id".to_string()))?;
        self.state.acquire_request_slot()?;
        let response = self
            .live_client()?
            .get_json(
                &format!("/users/{}/items", user_id),
                &[("per_page", limit.to_string())],
            )
            .await?;

        let raw_items = match response.get("items") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Ok(raw_items
            .into_iter()
            .map(|raw| {
                let external_id = raw
                    .get("id")
                    .map(|id| id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string()))
                    .unwrap_or_default();
                let item = parse_payload::<VintedItem>("vinted item", raw).map(mapping::to_internal);
                FetchedItem { external_id, item }
            })
            .collect())
    }

    async fn push_one(&self, item: &SyncedItem) -> Result<String> {
        let listing = mapping::to_external(&NewSyncedItem::from(item))?;
        if self.mode() == ConnectionMode::Mock {
            return Ok(format!("vinted_mock_{}", item.id));
        }
        self.state.acquire_request_slot()?;
        let body = serde_json::to_value(&listing)?;
        let response = self.live_client()?.post_json("/items", &body).await?;
        match response.get("id") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(Error::external(
                PLATFORM_VINTED,
                "listing created without an id in the response",
            )),
        }
    }
}

#[async_trait]
impl PlatformAdapter for VintedAdapter {
    fn platform_id(&self) -> &'static str {
        PLATFORM_VINTED
    }

    fn name(&self) -> &'static str {
        "Vinted"
    }

    fn category(&self) -> PlatformCategory {
        PlatformCategory::Marketplace
    }

    fn state(&self) -> &AdapterState {
        &self.state
    }

    async fn connect(&self) -> Result<ConnectionMode> {
        if self.client.is_none() {
            warn!("[vinted] no access token configured, running in mock mode");
            self.state.set_status(AdapterStatus::ConnectedMock);
            return Ok(ConnectionMode::Mock);
        }
        self.state.set_status(AdapterStatus::Connected);
        info!("[vinted] connected");
        Ok(ConnectionMode::Live)
    }

    async fn sync_inventory(&self, options: SyncOptions) -> Result<Outcome<SyncReport>> {
        let mode = self.mode();
        let limit = options.effective_limit(DEFAULT_SYNC_LIMIT, MAX_SYNC_LIMIT);
        let report = run_inventory_sync(
            &self.state,
            self.context.items.as_ref(),
            mode,
            self.fetch_items(mode, limit),
        )
        .await?;
        Ok(Outcome::Done(report))
    }

    async fn push_inventory(&self, items: Vec<SyncedItem>) -> Result<Outcome<Vec<PushItemResult>>> {
        let mut results = Vec::with_capacity(items.len());
        for item in &items {
            let result = self.push_one(item).await;
            self.state.record_result(&result);
            results.push(match result {
                Ok(external_id) => PushItemResult::pushed(&item.id, external_id),
                Err(e) => {
                    warn!("[vinted] push of item {} failed: {}", item.id, e);
                    PushItemResult::failed(&item.id, e.to_string())
                }
            });
        }
        info!(
            "[vinted] pushed {}/{} items",
            results.iter().filter(|r| r.success).count(),
            results.len()
        );
        Ok(Outcome::Done(results))
    }

    async fn create_order(&self, draft: OrderDraft) -> Result<Outcome<CreatedOrder>> {
        let order = self.create_pending_order(draft).await?;
        Ok(Outcome::Done(CreatedOrder::Order(Box::new(order))))
    }

    async fn update_shipment(
        &self,
        _tracking_number: &str,
        _update: ShipmentUpdate,
    ) -> Result<Outcome<Shipment>> {
        Ok(Outcome::not_applicable(
            false,
            "Vinted shipments are updated by the seller on vinted.com",
        ))
    }

    async fn handle_webhook(&self, event_type: &str, payload: Value) -> Result<WebhookOutcome> {
        info!("[vinted] webhook {}", event_type);
        let result = match event_type {
            "item.sold" => self.handle_item_sold(payload).await,
            "item.reserved" => self.handle_item_reserved(payload).await,
            "order.shipped" => self.handle_order_shipped(payload).await,
            "message.received" => {
                info!("[vinted] message received, not processed");
                Ok(WebhookOutcome::ignored("Chat integration not implemented"))
            }
            _ => {
                warn!("[vinted] unhandled webhook event type: {}", event_type);
                Ok(WebhookOutcome::unknown_event())
            }
        };
        self.state.record_result(&result);
        result
    }

    fn transform_to_internal(&self, external: &Value) -> Result<Value> {
        let item: VintedItem = parse_payload("vinted item", external.clone())?;
        Ok(serde_json::to_value(mapping::to_internal(item))?)
    }

    fn transform_to_external(&self, internal: &Value) -> Result<Value> {
        let item: NewSyncedItem = parse_payload("synced item", internal.clone())?;
        Ok(serde_json::to_value(mapping::to_external(&item)?)?)
    }

    fn validate_webhook_signature(&self, headers: &WebhookHeaders, raw_body: &[u8]) -> bool {
        self.verifier.verify(headers, raw_body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use unibridge_core::events::MockAdapterEventSink;

    fn mock_adapter() -> VintedAdapter {
        VintedAdapter::new(AdapterConfig::default(), AdapterContext::in_memory()).unwrap()
    }

    /// Serves canned responses and records request paths.
    struct StubClient {
        response: Value,
        paths: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PlatformHttpClient for StubClient {
        async fn get_json(&self, path: &str, _query: &[(&str, String)]) -> Result<Value> {
            self.paths.lock().unwrap().push(path.to_string());
            Ok(self.response.clone())
        }

        async fn post_json(&self, path: &str, _body: &Value) -> Result<Value> {
            self.paths.lock().unwrap().push(path.to_string());
            Ok(serde_json::json!({ "id": 555 }))
        }
    }

    #[tokio::test]
    async fn test_connect_without_credentials_enters_mock_mode() {
        let adapter = mock_adapter();
        assert_eq!(adapter.connect().await.unwrap(), ConnectionMode::Mock);
        assert_eq!(adapter.state().status(), AdapterStatus::ConnectedMock);
        assert!(adapter.health_check().await.healthy);
    }

    #[tokio::test]
    async fn test_sync_limit_is_capped() {
        let context = AdapterContext::in_memory();
        let adapter = VintedAdapter::new(AdapterConfig::default(), context.clone()).unwrap();
        adapter.connect().await.unwrap();

        adapter
            .sync_inventory(SyncOptions::with_limit(200_000))
            .await
            .unwrap()
            .done()
            .unwrap();
        assert_eq!(context.items.count_items(Some("vinted")).unwrap(), MAX_SYNC_LIMIT);
    }

    #[tokio::test]
    async fn test_repeated_mock_sync_is_idempotent() {
        let context = AdapterContext::in_memory();
        let adapter = VintedAdapter::new(AdapterConfig::default(), context.clone()).unwrap();
        adapter.connect().await.unwrap();

        let first = adapter
            .sync_inventory(SyncOptions::with_limit(5))
            .await
            .unwrap()
            .done()
            .unwrap();
        let ids: Vec<String> = context
            .items
            .list_items("vinted")
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();

        let second = adapter
            .sync_inventory(SyncOptions::with_limit(5))
            .await
            .unwrap()
            .done()
            .unwrap();
        let mut ids_after: Vec<String> = context
            .items
            .list_items("vinted")
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();

        assert_eq!(first.created, 5);
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 5);
        assert_eq!(context.items.count_items(Some("vinted")).unwrap(), 5);
        let mut ids = ids;
        ids.sort();
        ids_after.sort();
        assert_eq!(ids, ids_after);
    }

    #[tokio::test]
    async fn test_sync_rejected_while_in_progress() {
        let adapter = mock_adapter();
        adapter.connect().await.unwrap();
        let before = adapter.state().stats();

        let _guard = adapter.state().try_begin_sync().unwrap();
        let err = adapter
            .sync_inventory(SyncOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SyncInProgress(_)));
        assert_eq!(adapter.state().stats(), before);
    }

    #[tokio::test]
    async fn test_sync_complete_emitted_after_persistence() {
        let context = AdapterContext::in_memory();
        let adapter = VintedAdapter::new(AdapterConfig::default(), context.clone()).unwrap();
        let sink = MockAdapterEventSink::new();
        adapter.state().events().subscribe(Arc::new(sink.clone()));

        adapter
            .sync_inventory(SyncOptions::with_limit(3))
            .await
            .unwrap();

        assert_eq!(sink.names(), vec!["sync_complete"]);
        assert_eq!(context.items.count_items(Some("vinted")).unwrap(), 3);
        assert!(adapter.state().last_sync().is_some());
    }

    #[tokio::test]
    async fn test_live_sync_reads_user_items() {
        let config = AdapterConfig::default()
            .with_credential("access_token", "tok")
            .with_credential("user_id", "42");
        let stub = Arc::new(StubClient {
            response: serde_json::json!({
                "items": [
                    {"id": 1, "title": "Shoes", "price": "15.00", "catalog_id": "4"},
                    {"id": 2, "title": "Broken", "price": "not a price"}
                ]
            }),
            paths: Mutex::new(Vec::new()),
        });
        let adapter = VintedAdapter::new(config, AdapterContext::in_memory())
            .unwrap()
            .with_client(stub.clone());
        adapter.connect().await.unwrap();

        let report = adapter
            .sync_inventory(SyncOptions::default())
            .await
            .unwrap()
            .done()
            .unwrap();

        assert_eq!(report.mode, ConnectionMode::Live);
        assert_eq!(report.items_saved, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].external_id, "2");
        assert_eq!(stub.paths.lock().unwrap().as_slice(), ["/users/42/items"]);
    }

    #[tokio::test]
    async fn test_live_sync_without_user_id_emits_sync_error() {
        let config = AdapterConfig::default().with_credential("access_token", "tok");
        let adapter = VintedAdapter::new(config, AdapterContext::in_memory()).unwrap();
        let sink = MockAdapterEventSink::new();
        adapter.state().events().subscribe(Arc::new(sink.clone()));
        adapter.connect().await.unwrap();

        assert!(adapter.sync_inventory(SyncOptions::default()).await.is_err());
        assert_eq!(sink.names(), vec!["sync_error"]);
        assert!(!adapter.state().is_syncing());
    }

    #[tokio::test]
    async fn test_push_reports_each_item() {
        let context = AdapterContext::in_memory();
        let adapter = VintedAdapter::new(AdapterConfig::default(), context.clone()).unwrap();
        adapter.connect().await.unwrap();
        adapter
            .sync_inventory(SyncOptions::with_limit(2))
            .await
            .unwrap();

        let mut items = context.items.list_items("vinted").unwrap();
        items[1].title = String::new();

        let results = adapter.push_inventory(items).await.unwrap().done().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results.iter().filter(|r| r.success).count(), 1);
        assert!(results.iter().any(|r| r.error.is_some()));
    }

    #[tokio::test]
    async fn test_update_shipment_is_not_applicable() {
        let adapter = mock_adapter();
        let outcome = adapter
            .update_shipment(
                "TRK1",
                ShipmentUpdate::new(unibridge_core::shipments::ShipmentStatus::InTransit),
            )
            .await
            .unwrap();
        assert!(!outcome.is_applicable());
        assert!(!outcome.is_success());
    }
}
