use crate::errors::Result;
use crate::orders::orders_model::{NewOrder, Order, OrderUpdate};
use crate::storage::Upserted;
use async_trait::async_trait;

/// Trait for order persistence.
///
/// Orders are keyed by `(platform, external_order_id)` and never deleted.
/// Both write operations go through the lifecycle rules on [`Order`], so a
/// late or duplicated webhook can never move an order backwards.
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    /// Inserts the order or merges it into the existing record.
    async fn upsert_order(&self, order: NewOrder) -> Result<Upserted<Order>>;

    /// Applies a partial update. Returns `None` when no order exists yet.
    async fn update_order(
        &self,
        platform: &str,
        external_order_id: &str,
        update: OrderUpdate,
    ) -> Result<Option<Order>>;

    fn get_order(&self, platform: &str, external_order_id: &str) -> Result<Option<Order>>;
    fn list_orders(&self, platform: &str) -> Result<Vec<Order>>;
    fn count_orders(&self, platform: Option<&str>) -> Result<usize>;
}
