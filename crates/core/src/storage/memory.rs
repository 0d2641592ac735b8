//! DashMap-backed store implementing every repository trait.
//!
//! Each upsert runs inside a single `entry()` call, which holds the shard
//! lock for that key, so concurrent writers for the same natural key
//! serialize while writers for other keys proceed.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::errors::Result;
use crate::items::{ItemRepositoryTrait, NewSyncedItem, SyncedItem};
use crate::orders::{NewOrder, Order, OrderRepositoryTrait, OrderUpdate};
use crate::shipments::{Shipment, ShipmentRepositoryTrait, ShipmentUpdate};
use crate::storage::Upserted;

type NaturalKey = (String, String);

fn key(platform: &str, external_id: &str) -> NaturalKey {
    (platform.to_string(), external_id.to_string())
}

#[derive(Default)]
pub struct InMemoryBridgeStore {
    items: DashMap<NaturalKey, SyncedItem>,
    orders: DashMap<NaturalKey, Order>,
    shipments: DashMap<NaturalKey, Shipment>,
}

impl InMemoryBridgeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemRepositoryTrait for InMemoryBridgeStore {
    async fn upsert_item(&self, item: NewSyncedItem) -> Result<Upserted<SyncedItem>> {
        item.validate()?;
        let now = Utc::now();
        let result = match self.items.entry(key(&item.platform, &item.external_id)) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().apply(item, now);
                Upserted::updated(entry.get().clone())
            }
            Entry::Vacant(entry) => {
                let record = item.into_item(now);
                entry.insert(record.clone());
                Upserted::created(record)
            }
        };
        Ok(result)
    }

    async fn merge_item_metadata(
        &self,
        platform: &str,
        external_id: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<SyncedItem>> {
        let Some(mut item) = self.items.get_mut(&key(platform, external_id)) else {
            return Ok(None);
        };
        for (k, v) in patch {
            item.metadata.insert(k, v);
        }
        item.updated_at = Utc::now();
        Ok(Some(item.clone()))
    }

    fn get_item(&self, platform: &str, external_id: &str) -> Result<Option<SyncedItem>> {
        Ok(self
            .items
            .get(&key(platform, external_id))
            .map(|item| item.clone()))
    }

    fn list_items(&self, platform: &str) -> Result<Vec<SyncedItem>> {
        let mut items: Vec<SyncedItem> = self
            .items
            .iter()
            .filter(|entry| entry.key().0 == platform)
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| a.external_id.cmp(&b.external_id));
        Ok(items)
    }

    fn count_items(&self, platform: Option<&str>) -> Result<usize> {
        Ok(match platform {
            Some(p) => self.items.iter().filter(|e| e.key().0 == p).count(),
            None => self.items.len(),
        })
    }
}

#[async_trait]
impl OrderRepositoryTrait for InMemoryBridgeStore {
    async fn upsert_order(&self, order: NewOrder) -> Result<Upserted<Order>> {
        order.validate()?;
        let now = Utc::now();
        let result = match self
            .orders
            .entry(key(&order.platform, &order.external_order_id))
        {
            Entry::Occupied(mut entry) => {
                entry.get_mut().merge(order, now);
                Upserted::updated(entry.get().clone())
            }
            Entry::Vacant(entry) => {
                let record = order.into_order(now);
                entry.insert(record.clone());
                Upserted::created(record)
            }
        };
        Ok(result)
    }

    async fn update_order(
        &self,
        platform: &str,
        external_order_id: &str,
        update: OrderUpdate,
    ) -> Result<Option<Order>> {
        let Some(mut order) = self.orders.get_mut(&key(platform, external_order_id)) else {
            return Ok(None);
        };
        order.apply_update(update, Utc::now());
        Ok(Some(order.clone()))
    }

    fn get_order(&self, platform: &str, external_order_id: &str) -> Result<Option<Order>> {
        Ok(self
            .orders
            .get(&key(platform, external_order_id))
            .map(|order| order.clone()))
    }

    fn list_orders(&self, platform: &str) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| entry.key().0 == platform)
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(orders)
    }

    fn count_orders(&self, platform: Option<&str>) -> Result<usize> {
        Ok(match platform {
            Some(p) => self.orders.iter().filter(|e| e.key().0 == p).count(),
            None => self.orders.len(),
        })
    }
}

#[async_trait]
impl ShipmentRepositoryTrait for InMemoryBridgeStore {
    async fn record_shipment_update(
        &self,
        platform: &str,
        tracking_number: &str,
        carrier: &str,
        update: ShipmentUpdate,
    ) -> Result<Upserted<Shipment>> {
        let now = Utc::now();
        let result = match self.shipments.entry(key(platform, tracking_number)) {
            Entry::Occupied(mut entry) => {
                if entry.get_mut().record(update, now) {
                    Upserted::updated(entry.get().clone())
                } else {
                    Upserted::unchanged(entry.get().clone())
                }
            }
            Entry::Vacant(entry) => {
                let mut shipment = Shipment::new(platform, tracking_number, carrier, now);
                shipment.record(update, now);
                entry.insert(shipment.clone());
                Upserted::created(shipment)
            }
        };
        Ok(result)
    }

    fn get_shipment(&self, platform: &str, tracking_number: &str) -> Result<Option<Shipment>> {
        Ok(self
            .shipments
            .get(&key(platform, tracking_number))
            .map(|shipment| shipment.clone()))
    }

    fn count_shipments(&self, platform: Option<&str>) -> Result<usize> {
        Ok(match platform {
            Some(p) => self.shipments.iter().filter(|e| e.key().0 == p).count(),
            None => self.shipments.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::ItemCondition;
    use crate::orders::{OrderLine, OrderStatus, Party, PaymentStatus};
    use crate::shipments::ShipmentStatus;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn item(external_id: &str, title: &str) -> NewSyncedItem {
        NewSyncedItem {
            platform: "vinted".to_string(),
            external_id: external_id.to_string(),
            title: title.to_string(),
            description: None,
            price: dec!(10),
            currency: "EUR".to_string(),
            images: vec![],
            category: "other".to_string(),
            condition: ItemCondition::Good,
            metadata: Map::new(),
        }
    }

    fn order(external_order_id: &str) -> NewOrder {
        NewOrder {
            platform: "vinted".to_string(),
            external_order_id: external_order_id.to_string(),
            buyer: Party::new("vinted", "buyer-1"),
            seller: None,
            items: vec![OrderLine::new("vinted", "1", "Scarf", dec!(12), "EUR")],
            total_amount: dec!(12),
            shipping_cost: dec!(3),
            currency: "EUR".to_string(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Paid,
            escrow: None,
            tracking_number: None,
            carrier: None,
            metadata: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_same_natural_key_keeps_one_record_with_latest_title() {
        let store = InMemoryBridgeStore::new();

        let first = store.upsert_item(item("42", "Old title")).await.unwrap();
        let second = store.upsert_item(item("42", "New title")).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.record.id, second.record.id);
        assert_eq!(store.count_items(Some("vinted")).unwrap(), 1);
        assert_eq!(
            store.get_item("vinted", "42").unwrap().unwrap().title,
            "New title"
        );
    }

    #[tokio::test]
    async fn test_concurrent_upserts_do_not_duplicate() {
        let store = Arc::new(InMemoryBridgeStore::new());
        let writes = (0..16).map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .upsert_item(item("7", &format!("title {}", i)))
                    .await
                    .unwrap()
            })
        });
        let results = futures::future::join_all(writes).await;

        let created = results
            .into_iter()
            .filter(|r| r.as_ref().unwrap().created)
            .count();
        assert_eq!(created, 1);
        assert_eq!(store.count_items(None).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_metadata_merge_on_missing_item_returns_none() {
        let store = InMemoryBridgeStore::new();
        let mut patch = Map::new();
        patch.insert("reserved".to_string(), Value::Bool(true));
        let result = store
            .merge_item_metadata("vinted", "missing", patch)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_order_redelivery_is_not_created_twice() {
        let store = InMemoryBridgeStore::new();
        assert!(store.upsert_order(order("T-1")).await.unwrap().created);
        assert!(!store.upsert_order(order("T-1")).await.unwrap().created);
        assert_eq!(store.count_orders(None).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_order_ignores_unknown_order() {
        let store = InMemoryBridgeStore::new();
        let result = store
            .update_order("vinted", "nope", OrderUpdate::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_shipment_updates_append_history() {
        let store = InMemoryBridgeStore::new();
        store
            .record_shipment_update(
                "maersk",
                "MSKU1",
                "Maersk",
                ShipmentUpdate::new(ShipmentStatus::PickedUp),
            )
            .await
            .unwrap();
        let latest = store
            .record_shipment_update(
                "maersk",
                "MSKU1",
                "Maersk",
                ShipmentUpdate::new(ShipmentStatus::InTransit),
            )
            .await
            .unwrap();

        assert!(!latest.created);
        assert!(latest.changed);
        assert_eq!(latest.record.history.len(), 2);
        assert_eq!(latest.record.status, ShipmentStatus::InTransit);
        assert_eq!(store.count_shipments(Some("maersk")).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_redelivered_shipment_update_is_unchanged() {
        let store = InMemoryBridgeStore::new();
        let update = ShipmentUpdate::new(ShipmentStatus::Delivered).at(Some("Rotterdam".to_string()));
        let first = store
            .record_shipment_update("maersk", "MSKU1", "Maersk", update.clone())
            .await
            .unwrap();
        let again = store
            .record_shipment_update("maersk", "MSKU1", "Maersk", update)
            .await
            .unwrap();

        assert!(first.changed);
        assert!(!again.created);
        assert!(!again.changed);
        assert_eq!(again.record.history.len(), 1);
    }
}
