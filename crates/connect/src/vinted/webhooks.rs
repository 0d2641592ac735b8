//! Vinted webhook handlers and operator-created orders.

use log::{debug, info};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use unibridge_core::constants::{DEFAULT_CURRENCY, PLATFORM_VINTED};
use unibridge_core::errors::{Result, ValidationError};
use unibridge_core::events::AdapterEvent;
use unibridge_core::orders::{
    Escrow, EscrowStatus, NewOrder, Order, OrderLine, OrderStatus, OrderUpdate, Party,
    PaymentStatus,
};
use unibridge_core::shipments::{ShipmentStatus, ShipmentUpdate};
use uuid::Uuid;

use super::VintedAdapter;
use crate::adapter::{
    decimal, opt_string_or_number, parse_payload, string_or_number, OrderDraft, WebhookOutcome,
};

#[derive(Debug, Deserialize)]
struct VintedUser {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default)]
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemSold {
    #[serde(deserialize_with = "string_or_number")]
    item_id: String,
    #[serde(deserialize_with = "string_or_number")]
    transaction_id: String,
    buyer: VintedUser,
    #[serde(deserialize_with = "decimal")]
    price: Decimal,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemReserved {
    #[serde(deserialize_with = "string_or_number")]
    item_id: String,
    buyer: VintedUser,
}

#[derive(Debug, Deserialize)]
struct OrderShipped {
    #[serde(deserialize_with = "string_or_number")]
    transaction_id: String,
    #[serde(deserialize_with = "string_or_number")]
    tracking_number: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    carrier: Option<String>,
}

impl VintedAdapter {
    /// Upserts the order and reports creation exactly once per order.
    async fn store_order(&self, order: NewOrder) -> Result<Order> {
        let upserted = self.context.orders.upsert_order(order).await?;
        let order = upserted.record;
        if upserted.created {
            self.state.add_order_processed();
            self.state.emit(AdapterEvent::order_created(
                &order.id,
                &order.external_order_id,
                order.total_amount,
                &order.currency,
            ));
        } else {
            debug!(
                "[vinted] order {} already known, merged",
                order.external_order_id
            );
        }
        Ok(order)
    }

    pub(super) async fn handle_item_sold(&self, payload: Value) -> Result<WebhookOutcome> {
        let sold: ItemSold = parse_payload("item.sold", payload)?;
        let currency = sold
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let title = match sold.title {
            Some(title) => title,
            None => self
                .context
                .items
                .get_item(PLATFORM_VINTED, &sold.item_id)?
                .map(|item| item.title)
                .unwrap_or_default(),
        };

        let order = NewOrder {
            platform: PLATFORM_VINTED.to_string(),
            external_order_id: sold.transaction_id,
            buyer: Party::new(PLATFORM_VINTED, sold.buyer.id).with_name(sold.buyer.login),
            seller: None,
            items: vec![OrderLine::new(
                PLATFORM_VINTED,
                sold.item_id.clone(),
                title,
                sold.price,
                currency.clone(),
            )],
            total_amount: sold.price,
            shipping_cost: Decimal::ZERO,
            currency: currency.clone(),
            status: OrderStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            escrow: Some(Escrow {
                status: EscrowStatus::Held,
                amount: sold.price,
                currency,
            }),
            tracking_number: None,
            carrier: None,
            metadata: Map::new(),
        };
        let order = self.store_order(order).await?;

        let mut patch = Map::new();
        patch.insert("sold".to_string(), json!(true));
        self.context
            .items
            .merge_item_metadata(PLATFORM_VINTED, &sold.item_id, patch)
            .await?;

        Ok(WebhookOutcome::processed()
            .with_order_id(order.id)
            .with_status(order.status.as_str()))
    }

    pub(super) async fn handle_item_reserved(&self, payload: Value) -> Result<WebhookOutcome> {
        let reserved: ItemReserved = parse_payload("item.reserved", payload)?;
        let mut patch = Map::new();
        patch.insert("reserved".to_string(), json!(true));
        patch.insert("reservedBy".to_string(), json!(reserved.buyer.id));

        let item = self
            .context
            .items
            .merge_item_metadata(PLATFORM_VINTED, &reserved.item_id, patch)
            .await?;
        Ok(match item {
            Some(_) => WebhookOutcome::processed(),
            None => {
                info!(
                    "[vinted] reservation for unsynced item {}",
                    reserved.item_id
                );
                WebhookOutcome::ignored("Item not found")
            }
        })
    }

    pub(super) async fn handle_order_shipped(&self, payload: Value) -> Result<WebhookOutcome> {
        let shipped: OrderShipped = parse_payload("order.shipped", payload)?;
        let carrier = shipped.carrier.unwrap_or_else(|| "vinted".to_string());
        let update = OrderUpdate {
            status: Some(OrderStatus::Shipped),
            tracking_number: Some(shipped.tracking_number.clone()),
            carrier: Some(carrier.clone()),
            ..Default::default()
        };

        let Some(order) = self
            .context
            .orders
            .update_order(PLATFORM_VINTED, &shipped.transaction_id, update)
            .await?
        else {
            info!(
                "[vinted] shipment for unknown order {}",
                shipped.transaction_id
            );
            return Ok(WebhookOutcome::ignored("Order not found"));
        };

        let shipment = ShipmentUpdate::new(ShipmentStatus::InTransit).described("Shipped by seller");
        let recorded = self
            .context
            .shipments
            .record_shipment_update(PLATFORM_VINTED, &shipped.tracking_number, &carrier, shipment)
            .await?;
        if recorded.changed {
            self.state.emit(AdapterEvent::shipment_updated(
                &shipped.tracking_number,
                recorded.record.status,
                Some(order.id.clone()),
            ));
        }

        Ok(WebhookOutcome::processed()
            .with_order_id(order.id)
            .with_tracking_number(shipped.tracking_number)
            .with_status(order.status.as_str()))
    }

    /// Creates a pending order with its payment held in a pending escrow.
    pub(super) async fn create_pending_order(&self, draft: OrderDraft) -> Result<Order> {
        let buyer = draft
            .buyer
            .ok_or_else(|| ValidationError::MissingField("buyer".to_string()))?;
        if draft.items.is_empty() {
            return Err(ValidationError::MissingField("items".to_string()).into());
        }
        let currency = draft
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let items: Vec<OrderLine> = draft
            .items
            .into_iter()
            .map(|line| {
                let mut order_line = OrderLine::new(
                    PLATFORM_VINTED,
                    line.external_id,
                    line.title,
                    line.price,
                    currency.clone(),
                );
                order_line.quantity = line.quantity;
                order_line
            })
            .collect();
        let subtotal: Decimal = items
            .iter()
            .map(|line| line.price * Decimal::from(line.quantity))
            .sum();
        let total = draft
            .total_amount
            .unwrap_or(subtotal + draft.shipping_cost);

        let mut metadata = Map::new();
        if let Some(address) = draft.shipping_address {
            metadata.insert("shippingAddress".to_string(), address);
        }

        let order = NewOrder {
            platform: PLATFORM_VINTED.to_string(),
            external_order_id: draft
                .external_order_id
                .unwrap_or_else(|| Uuid::now_v7().to_string()),
            buyer: Party::new(PLATFORM_VINTED, buyer.external_id)
                .with_name(buyer.name)
                .with_email(buyer.email),
            seller: draft.seller.map(|seller| {
                Party::new(PLATFORM_VINTED, seller.external_id)
                    .with_name(seller.name)
                    .with_email(seller.email)
            }),
            items,
            total_amount: total,
            shipping_cost: draft.shipping_cost,
            currency: currency.clone(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            escrow: Some(Escrow {
                status: EscrowStatus::Pending,
                amount: total,
                currency,
            }),
            tracking_number: None,
            carrier: None,
            metadata,
        };
        let order = self.store_order(order).await?;
        info!("[vinted] created order {}", order.external_order_id);
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;
    use serde_json::json;
    use unibridge_core::events::MockAdapterEventSink;

    use crate::adapter::{
        AdapterContext, CreatedOrder, OrderLineDraft, PartyDraft, PlatformAdapter, SyncOptions,
    };
    use crate::config::AdapterConfig;

    use super::*;

    fn adapter(context: &AdapterContext) -> VintedAdapter {
        VintedAdapter::new(AdapterConfig::default(), context.clone()).unwrap()
    }

    fn sold_payload() -> Value {
        json!({
            "item_id": "vinted_mock_0",
            "transaction_id": "tx-1",
            "buyer": {"id": 77, "login": "ana"},
            "price": "19.99"
        })
    }

    #[tokio::test]
    async fn test_item_sold_creates_order_once() {
        let context = AdapterContext::in_memory();
        let adapter = adapter(&context);
        let sink = MockAdapterEventSink::new();
        adapter.state().events().subscribe(Arc::new(sink.clone()));

        let first = adapter
            .handle_webhook("item.sold", sold_payload())
            .await
            .unwrap();
        let second = adapter
            .handle_webhook("item.sold", sold_payload())
            .await
            .unwrap();

        assert!(first.processed);
        assert_eq!(first.order_id, second.order_id);
        assert_eq!(context.orders.count_orders(Some("vinted")).unwrap(), 1);
        assert_eq!(adapter.state().stats().orders_processed, 1);
        assert_eq!(sink.names(), vec!["order_created"]);

        let order = context.orders.get_order("vinted", "tx-1").unwrap().unwrap();
        assert_eq!(order.total_amount, dec!(19.99));
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.buyer.name.as_deref(), Some("ana"));
    }

    #[tokio::test]
    async fn test_item_reserved_marks_synced_item() {
        let context = AdapterContext::in_memory();
        let adapter = adapter(&context);
        adapter
            .sync_inventory(SyncOptions::with_limit(1))
            .await
            .unwrap();

        let outcome = adapter
            .handle_webhook(
                "item.reserved",
                json!({"item_id": "vinted_mock_0", "buyer": {"id": "b9"}}),
            )
            .await
            .unwrap();
        assert!(outcome.processed);

        let item = context
            .items
            .get_item("vinted", "vinted_mock_0")
            .unwrap()
            .unwrap();
        assert_eq!(item.metadata["reserved"], true);
        assert_eq!(item.metadata["reservedBy"], "b9");

        let missing = adapter
            .handle_webhook(
                "item.reserved",
                json!({"item_id": "nope", "buyer": {"id": "b9"}}),
            )
            .await
            .unwrap();
        assert!(!missing.processed);
    }

    #[tokio::test]
    async fn test_order_shipped_updates_order_and_shipment() {
        let context = AdapterContext::in_memory();
        let adapter = adapter(&context);
        adapter
            .handle_webhook("item.sold", sold_payload())
            .await
            .unwrap();

        let sink = MockAdapterEventSink::new();
        adapter.state().events().subscribe(Arc::new(sink.clone()));
        let outcome = adapter
            .handle_webhook(
                "order.shipped",
                json!({"transaction_id": "tx-1", "tracking_number": "TRK9", "carrier": "ups"}),
            )
            .await
            .unwrap();

        assert!(outcome.processed);
        assert_eq!(outcome.tracking_number.as_deref(), Some("TRK9"));
        let order = context.orders.get_order("vinted", "tx-1").unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.carrier.as_deref(), Some("ups"));
        assert!(context
            .shipments
            .get_shipment("vinted", "TRK9")
            .unwrap()
            .is_some());
        assert_eq!(sink.names(), vec!["shipment_updated"]);
    }

    #[tokio::test]
    async fn test_late_sold_event_does_not_regress_shipped_order() {
        let context = AdapterContext::in_memory();
        let adapter = adapter(&context);
        adapter
            .handle_webhook("item.sold", sold_payload())
            .await
            .unwrap();
        adapter
            .handle_webhook(
                "order.shipped",
                json!({"transaction_id": "tx-1", "tracking_number": "TRK9"}),
            )
            .await
            .unwrap();
        adapter
            .handle_webhook("item.sold", sold_payload())
            .await
            .unwrap();

        let order = context.orders.get_order("vinted", "tx-1").unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_shipped_for_unknown_order_is_not_processed() {
        let context = AdapterContext::in_memory();
        let outcome = adapter(&context)
            .handle_webhook(
                "order.shipped",
                json!({"transaction_id": "ghost", "tracking_number": "T"}),
            )
            .await
            .unwrap();
        assert!(!outcome.processed);
        assert_eq!(outcome.reason.as_deref(), Some("Order not found"));
    }

    #[tokio::test]
    async fn test_message_and_unknown_events() {
        let context = AdapterContext::in_memory();
        let adapter = adapter(&context);
        let message = adapter
            .handle_webhook("message.received", json!({}))
            .await
            .unwrap();
        assert_eq!(
            message.reason.as_deref(),
            Some("Chat integration not implemented")
        );
        let unknown = adapter
            .handle_webhook("item.teleported", json!({}))
            .await
            .unwrap();
        assert_eq!(unknown, WebhookOutcome::unknown_event());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_an_error() {
        let context = AdapterContext::in_memory();
        let adapter = adapter(&context);
        assert!(adapter
            .handle_webhook("item.sold", json!({"item_id": 1}))
            .await
            .is_err());
        assert_eq!(adapter.state().stats().failed_requests, 1);
    }

    #[tokio::test]
    async fn test_create_order_is_pending_with_pending_escrow() {
        let context = AdapterContext::in_memory();
        let adapter = adapter(&context);
        let draft = OrderDraft {
            external_order_id: Some("manual-1".to_string()),
            buyer: Some(PartyDraft {
                external_id: "u1".to_string(),
                name: None,
                email: Some("u1@example.com".to_string()),
            }),
            items: vec![OrderLineDraft {
                external_id: "i1".to_string(),
                title: "Bag".to_string(),
                quantity: 2,
                price: dec!(10),
            }],
            shipping_cost: dec!(3.5),
            ..Default::default()
        };

        let created = adapter.create_order(draft).await.unwrap().done().unwrap();
        let CreatedOrder::Order(order) = created else {
            panic!("expected an order");
        };
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, dec!(23.5));
        let escrow = order.escrow.unwrap();
        assert_eq!(escrow.status, EscrowStatus::Pending);
        assert_eq!(escrow.amount, dec!(23.5));
    }

    #[tokio::test]
    async fn test_create_order_requires_buyer() {
        let context = AdapterContext::in_memory();
        assert!(adapter(&context)
            .create_order(OrderDraft::default())
            .await
            .is_err());
    }
}
