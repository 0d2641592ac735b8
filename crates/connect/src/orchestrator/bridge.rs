use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use unibridge_core::constants::PLATFORM_MAERSK;
use unibridge_core::errors::{Error, Result};
use unibridge_core::events::BridgeEvent;
use unibridge_core::items::SyncedItem;
use unibridge_core::shipments::{Shipment, ShipmentUpdate};

use super::stats::{BridgeCounters, BridgeForwarder, BridgeHealth, BridgeStats};
use crate::adapter::{
    AdapterInfo, CreatedOrder, OrderDraft, Outcome, PlatformAdapter, PushItemResult,
    SubscriptionId, SyncOptions, SyncReport, TrackingSnapshot, WebhookOutcome,
};

/// Logistics adapters tried, in order, when tracking without a platform.
pub const LOGISTICS_FALLBACK_ORDER: &[&str] = &[PLATFORM_MAERSK];

const EVENT_BUS_CAPACITY: usize = 256;

/// Per-adapter entry of a `sync_all` run.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSyncResult {
    pub platform_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Outcome<SyncReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct RegisteredAdapter {
    adapter: Arc<dyn PlatformAdapter>,
    subscription: SubscriptionId,
}

/// Holds the registered adapters and fans operations out to them.
///
/// Lookups clone the adapter `Arc` out of the map before awaiting, so no
/// shard lock is ever held across an `.await`.
pub struct BridgeOrchestrator {
    adapters: DashMap<String, RegisteredAdapter>,
    counters: Arc<BridgeCounters>,
    bus: broadcast::Sender<BridgeEvent>,
}

impl Default for BridgeOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeOrchestrator {
    pub fn new() -> Self {
        let (bus, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            adapters: DashMap::new(),
            counters: Arc::new(BridgeCounters::default()),
            bus,
        }
    }

    /// Receives every adapter event, tagged with its platform id.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.bus.subscribe()
    }

    /// Registers `adapter` under `platform_id`, replacing any previous one.
    pub fn register_adapter(&self, platform_id: &str, adapter: Arc<dyn PlatformAdapter>) {
        let forwarder = BridgeForwarder {
            counters: self.counters.clone(),
            bus: self.bus.clone(),
        };
        let subscription = adapter.state().events().subscribe(Arc::new(forwarder));
        let previous = self.adapters.insert(
            platform_id.to_string(),
            RegisteredAdapter {
                adapter,
                subscription,
            },
        );

        if let Some(previous) = previous {
            warn!("Adapter {} already registered, replacing it", platform_id);
            previous
                .adapter
                .state()
                .events()
                .unsubscribe(previous.subscription);
        }
        info!("Registered adapter {}", platform_id);
    }

    /// Disconnects the adapter, then removes it.
    pub async fn unregister_adapter(&self, platform_id: &str) -> Result<()> {
        let adapter = self.require(platform_id)?;
        if let Err(e) = adapter.disconnect().await {
            warn!("[{}] disconnect failed during unregister: {}", platform_id, e);
        }

        // A replacement registered while disconnecting stays in place.
        let removed = self
            .adapters
            .remove_if(platform_id, |_, entry| Arc::ptr_eq(&entry.adapter, &adapter));
        match removed {
            Some((_, removed)) => {
                removed
                    .adapter
                    .state()
                    .events()
                    .unsubscribe(removed.subscription);
                info!("Unregistered adapter {}", platform_id);
            }
            None => warn!(
                "[{}] replaced while unregistering, keeping the new adapter",
                platform_id
            ),
        }
        Ok(())
    }

    pub fn get_adapter(&self, platform_id: &str) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters
            .get(platform_id)
            .map(|entry| entry.adapter.clone())
    }

    fn require(&self, platform_id: &str) -> Result<Arc<dyn PlatformAdapter>> {
        self.get_adapter(platform_id)
            .ok_or_else(|| Error::AdapterNotFound(platform_id.to_string()))
    }

    fn snapshot(&self) -> Vec<(String, Arc<dyn PlatformAdapter>)> {
        let mut adapters: Vec<_> = self
            .adapters
            .iter()
            .map(|entry| (entry.key().clone(), entry.adapter.clone()))
            .collect();
        adapters.sort_by(|a, b| a.0.cmp(&b.0));
        adapters
    }

    pub fn platform_ids(&self) -> Vec<String> {
        self.snapshot().into_iter().map(|(id, _)| id).collect()
    }

    pub fn list_adapters(&self) -> Vec<AdapterInfo> {
        self.snapshot()
            .into_iter()
            .map(|(_, adapter)| adapter.info())
            .collect()
    }

    pub async fn sync_inventory(
        &self,
        platform_id: &str,
        options: SyncOptions,
    ) -> Result<Outcome<SyncReport>> {
        let adapter = self.require(platform_id)?;
        adapter.sync_inventory(options).await.inspect_err(|e| {
            error!("[{}] sync_inventory failed: {}", platform_id, e);
        })
    }

    /// Syncs every adapter concurrently. One failure never stops the others.
    pub async fn sync_all(&self, options: SyncOptions) -> Vec<PlatformSyncResult> {
        let adapters = self.snapshot();
        info!("Syncing {} adapters", adapters.len());

        let runs = adapters.into_iter().map(|(platform_id, adapter)| {
            let options = options.clone();
            async move {
                match adapter.sync_inventory(options).await {
                    Ok(outcome) => PlatformSyncResult {
                        platform_id,
                        success: outcome.is_success(),
                        result: Some(outcome),
                        error: None,
                    },
                    Err(e) => {
                        error!("[{}] sync failed: {}", platform_id, e);
                        PlatformSyncResult {
                            platform_id,
                            success: false,
                            result: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            }
        });
        let results = join_all(runs).await;

        info!(
            "Sync finished: {}/{} adapters succeeded",
            results.iter().filter(|r| r.success).count(),
            results.len()
        );
        results
    }

    pub async fn process_webhook(
        &self,
        platform_id: &str,
        event_type: &str,
        payload: Value,
    ) -> Result<WebhookOutcome> {
        let adapter = self.require(platform_id)?;
        match adapter.handle_webhook(event_type, payload).await {
            Ok(outcome) => {
                self.counters.webhook_processed();
                debug!(
                    "[{}] webhook {} handled (processed: {})",
                    platform_id, event_type, outcome.processed
                );
                Ok(outcome)
            }
            Err(e) => {
                error!("[{}] webhook {} failed: {}", platform_id, event_type, e);
                Err(e)
            }
        }
    }

    pub async fn create_order(
        &self,
        platform_id: &str,
        draft: OrderDraft,
    ) -> Result<Outcome<CreatedOrder>> {
        let adapter = self.require(platform_id)?;
        adapter.create_order(draft).await.inspect_err(|e| {
            error!("[{}] create_order failed: {}", platform_id, e);
        })
    }

    pub async fn update_shipment(
        &self,
        platform_id: &str,
        tracking_number: &str,
        update: ShipmentUpdate,
    ) -> Result<Outcome<Shipment>> {
        let adapter = self.require(platform_id)?;
        adapter
            .update_shipment(tracking_number, update)
            .await
            .inspect_err(|e| {
                error!("[{}] update_shipment failed: {}", platform_id, e);
            })
    }

    pub async fn push_inventory(
        &self,
        platform_id: &str,
        items: Vec<SyncedItem>,
    ) -> Result<Outcome<Vec<PushItemResult>>> {
        let adapter = self.require(platform_id)?;
        adapter.push_inventory(items).await.inspect_err(|e| {
            error!("[{}] push_inventory failed: {}", platform_id, e);
        })
    }

    /// Tracks on `platform_id`, or on the first logistics adapter in
    /// [`LOGISTICS_FALLBACK_ORDER`] that answers.
    pub async fn track_shipment(
        &self,
        tracking_number: &str,
        platform_id: Option<&str>,
    ) -> Result<Outcome<TrackingSnapshot>> {
        if let Some(platform_id) = platform_id {
            return self.require(platform_id)?.track_shipment(tracking_number).await;
        }

        let mut last_error = None;
        for candidate in LOGISTICS_FALLBACK_ORDER {
            let Some(adapter) = self.get_adapter(candidate) else {
                continue;
            };
            match adapter.track_shipment(tracking_number).await {
                Ok(outcome) if outcome.is_applicable() => return Ok(outcome),
                Ok(_) => debug!("[{}] cannot track {}", candidate, tracking_number),
                Err(e) => {
                    warn!("[{}] tracking {} failed: {}", candidate, tracking_number, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(Outcome::not_applicable(
                false,
                "No logistics adapter available to track this shipment",
            )),
        }
    }

    pub fn get_stats(&self) -> BridgeStats {
        let adapters = self.snapshot();
        let active = adapters
            .iter()
            .filter(|(_, adapter)| adapter.state().status().is_connected())
            .count();
        self.counters.snapshot(active, adapters.len())
    }

    pub async fn health_check(&self) -> BridgeHealth {
        let adapters = self.snapshot();
        let reports = join_all(adapters.iter().map(|(_, adapter)| adapter.health_check())).await;
        BridgeHealth {
            healthy: reports.iter().all(|report| report.healthy),
            adapters: reports,
        }
    }

    /// Disconnects and removes every adapter.
    pub async fn shutdown(&self) {
        info!("Shutting down bridge");
        for platform_id in self.platform_ids() {
            if let Err(e) = self.unregister_adapter(&platform_id).await {
                warn!("[{}] shutdown: {}", platform_id, e);
            }
        }
    }
}
