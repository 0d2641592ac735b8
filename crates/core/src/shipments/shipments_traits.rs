use crate::errors::Result;
use crate::shipments::shipments_model::{Shipment, ShipmentUpdate};
use crate::storage::Upserted;
use async_trait::async_trait;

/// Trait for shipment persistence, keyed by `(platform, tracking_number)`.
#[async_trait]
pub trait ShipmentRepositoryTrait: Send + Sync {
    /// Appends `update` to the shipment's history, creating the shipment on
    /// first sight. Must be atomic per key.
    async fn record_shipment_update(
        &self,
        platform: &str,
        tracking_number: &str,
        carrier: &str,
        update: ShipmentUpdate,
    ) -> Result<Upserted<Shipment>>;

    fn get_shipment(&self, platform: &str, tracking_number: &str) -> Result<Option<Shipment>>;
    fn count_shipments(&self, platform: Option<&str>) -> Result<usize>;
}
