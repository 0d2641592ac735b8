//! The capability contract every platform adapter implements.

use async_trait::async_trait;
use serde_json::Value;
use unibridge_core::errors::{Error, Result};
use unibridge_core::items::SyncedItem;
use unibridge_core::shipments::{Shipment, ShipmentUpdate};

use super::state::{AdapterState, AdapterStatus};
use super::types::{
    AdapterInfo, Booking, BookingRequest, ConnectionMode, CreatedOrder, HealthReport, OrderDraft,
    Outcome, PlatformCategory, PushItemResult, SyncOptions, SyncReport, TrackingSnapshot,
    WebhookOutcome,
};
use crate::signature::WebhookHeaders;

/// Contract between the bridge and one external platform.
///
/// Operations a platform cannot support answer with
/// [`Outcome::NotApplicable`]. The four core operations below default to
/// [`Error::NotImplemented`] instead: an adapter that forgot to decide what
/// they mean for its platform is a bug, and should fail on first use rather
/// than quietly report success.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Stable lowercase id, unique within the registry.
    fn platform_id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn category(&self) -> PlatformCategory;

    fn state(&self) -> &AdapterState;

    /// Connects to the platform, or enters mock mode when no credentials
    /// are configured.
    async fn connect(&self) -> Result<ConnectionMode>;

    async fn disconnect(&self) -> Result<()> {
        self.state().set_status(AdapterStatus::Disconnected);
        log::info!("[{}] disconnected", self.platform_id());
        Ok(())
    }

    async fn sync_inventory(&self, _options: SyncOptions) -> Result<Outcome<SyncReport>> {
        Err(Error::not_implemented(self.platform_id(), "sync_inventory"))
    }

    /// Best-effort push; one result per input item.
    async fn push_inventory(
        &self,
        _items: Vec<SyncedItem>,
    ) -> Result<Outcome<Vec<PushItemResult>>> {
        Err(Error::not_implemented(self.platform_id(), "push_inventory"))
    }

    async fn create_order(&self, _draft: OrderDraft) -> Result<Outcome<CreatedOrder>> {
        Err(Error::not_implemented(self.platform_id(), "create_order"))
    }

    async fn update_shipment(
        &self,
        _tracking_number: &str,
        _update: ShipmentUpdate,
    ) -> Result<Outcome<Shipment>> {
        Err(Error::not_implemented(self.platform_id(), "update_shipment"))
    }

    /// Dispatches one webhook by event type. Unknown types are answered with
    /// [`WebhookOutcome::unknown_event`], never an error.
    async fn handle_webhook(&self, event_type: &str, payload: Value) -> Result<WebhookOutcome>;

    async fn track_shipment(&self, _tracking_number: &str) -> Result<Outcome<TrackingSnapshot>> {
        Ok(Outcome::not_applicable(
            false,
            format!("Shipment tracking is not supported by {}", self.name()),
        ))
    }

    async fn create_booking(&self, _request: BookingRequest) -> Result<Outcome<Booking>> {
        Ok(Outcome::not_applicable(
            false,
            format!("Freight bookings are not supported by {}", self.name()),
        ))
    }

    /// Maps a platform-native record into its canonical JSON shape.
    fn transform_to_internal(&self, external: &Value) -> Result<Value>;

    /// Maps a canonical record into the platform-native JSON shape.
    fn transform_to_external(&self, internal: &Value) -> Result<Value>;

    /// Checks the delivery signature over the exact bytes received.
    fn validate_webhook_signature(&self, headers: &WebhookHeaders, raw_body: &[u8]) -> bool;

    /// Cheap and non-mutating.
    async fn health_check(&self) -> HealthReport {
        let state = self.state();
        let status = state.status();
        HealthReport {
            platform_id: self.platform_id().to_string(),
            healthy: status.is_connected(),
            status,
            last_sync: state.last_sync(),
            message: (!status.is_connected()).then(|| format!("Adapter is {}", status)),
        }
    }

    fn info(&self) -> AdapterInfo {
        let state = self.state();
        AdapterInfo {
            platform_id: self.platform_id().to_string(),
            name: self.name().to_string(),
            category: self.category(),
            status: state.status(),
            sync_in_progress: state.is_syncing(),
            last_sync: state.last_sync(),
            stats: state.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Adapter that only fills in the required methods.
    struct BareAdapter {
        state: AdapterState,
    }

    #[async_trait]
    impl PlatformAdapter for BareAdapter {
        fn platform_id(&self) -> &'static str {
            "bare"
        }
        fn name(&self) -> &'static str {
            "Bare"
        }
        fn category(&self) -> PlatformCategory {
            PlatformCategory::Marketplace
        }
        fn state(&self) -> &AdapterState {
            &self.state
        }
        async fn connect(&self) -> Result<ConnectionMode> {
            self.state.set_status(AdapterStatus::ConnectedMock);
            Ok(ConnectionMode::Mock)
        }
        async fn handle_webhook(&self, _: &str, _: Value) -> Result<WebhookOutcome> {
            Ok(WebhookOutcome::unknown_event())
        }
        fn transform_to_internal(&self, external: &Value) -> Result<Value> {
            Ok(external.clone())
        }
        fn transform_to_external(&self, internal: &Value) -> Result<Value> {
            Ok(internal.clone())
        }
        fn validate_webhook_signature(&self, _: &WebhookHeaders, _: &[u8]) -> bool {
            false
        }
    }

    fn bare() -> BareAdapter {
        BareAdapter {
            state: AdapterState::new("bare", 60),
        }
    }

    #[tokio::test]
    async fn test_unimplemented_core_operations_fail_loudly() {
        let adapter = bare();
        let err = adapter
            .sync_inventory(SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NotImplemented {
                operation: "sync_inventory",
                ..
            }
        ));
        assert!(adapter.push_inventory(vec![]).await.is_err());
        assert!(adapter.create_order(OrderDraft::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_logistics_extensions_default_to_not_applicable() {
        let adapter = bare();
        let outcome = adapter.track_shipment("MSKU1").await.unwrap();
        assert!(!outcome.is_applicable());
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_health_follows_status() {
        let adapter = bare();
        assert!(!adapter.health_check().await.healthy);
        adapter.connect().await.unwrap();
        assert!(adapter.health_check().await.healthy);
        adapter.disconnect().await.unwrap();
        assert!(!adapter.health_check().await.healthy);
    }
}
