//! Airbnb reservation and payout webhooks.

use log::{debug, info};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use unibridge_core::constants::{DEFAULT_CURRENCY, PLATFORM_AIRBNB};
use unibridge_core::errors::Result;
use unibridge_core::events::AdapterEvent;
use unibridge_core::orders::{NewOrder, OrderLine, OrderStatus, OrderUpdate, Party, PaymentStatus};

use super::mapping::calculate_nights;
use super::AirbnbAdapter;
use crate::adapter::{
    decimal, opt_decimal, opt_string_or_number, parse_payload, string_or_number, WebhookOutcome,
};

#[derive(Debug, Deserialize)]
struct ReservedListing {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Guest {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReservationCreated {
    confirmation_code: String,
    listing: ReservedListing,
    guest: Guest,
    start_date: String,
    end_date: String,
    #[serde(deserialize_with = "decimal")]
    total_price: Decimal,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReservationRef {
    confirmation_code: String,
    #[serde(default, deserialize_with = "opt_decimal")]
    refund_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct PayoutCompleted {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    listing_id: Option<String>,
    #[serde(deserialize_with = "decimal")]
    payout_amount: Decimal,
    #[serde(default)]
    payout_date: Option<String>,
    #[serde(default)]
    reservations: Vec<Value>,
}

impl AirbnbAdapter {
    pub(super) async fn handle_reservation_created(
        &self,
        payload: Value,
    ) -> Result<WebhookOutcome> {
        let reservation: ReservationCreated = parse_payload("reservation.created", payload)?;
        let nights = calculate_nights(&reservation.start_date, &reservation.end_date)?;
        let currency = reservation
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let mut line = OrderLine::new(
            PLATFORM_AIRBNB,
            reservation.listing.id,
            reservation.listing.name.unwrap_or_default(),
            reservation.total_price,
            currency.clone(),
        );
        line.metadata.insert("checkIn".to_string(), json!(reservation.start_date));
        line.metadata.insert("checkOut".to_string(), json!(reservation.end_date));
        line.metadata.insert("nights".to_string(), json!(nights));

        let order = NewOrder {
            platform: PLATFORM_AIRBNB.to_string(),
            external_order_id: reservation.confirmation_code,
            buyer: Party::new(PLATFORM_AIRBNB, reservation.guest.id)
                .with_name(reservation.guest.first_name)
                .with_email(reservation.guest.email),
            seller: None,
            items: vec![line],
            total_amount: reservation.total_price,
            shipping_cost: Decimal::ZERO,
            currency,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            escrow: None,
            tracking_number: None,
            carrier: None,
            metadata: Map::new(),
        };

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
                "[airbnb] reservation {} redelivered",
                order.external_order_id
            );
        }

        Ok(WebhookOutcome::processed()
            .with_order_id(order.id)
            .with_status(order.status.as_str()))
    }

    async fn update_reservation(
        &self,
        confirmation_code: &str,
        update: OrderUpdate,
    ) -> Result<WebhookOutcome> {
        match self
            .context
            .orders
            .update_order(PLATFORM_AIRBNB, confirmation_code, update)
            .await?
        {
            Some(order) => Ok(WebhookOutcome::processed()
                .with_order_id(order.id)
                .with_status(order.status.as_str())),
            None => {
                info!("[airbnb] update for unknown reservation {}", confirmation_code);
                Ok(WebhookOutcome::ignored("Order not found"))
            }
        }
    }

    pub(super) async fn handle_reservation_confirmed(
        &self,
        payload: Value,
    ) -> Result<WebhookOutcome> {
        let reservation: ReservationRef = parse_payload("reservation.confirmed", payload)?;
        let update = OrderUpdate {
            status: Some(OrderStatus::Confirmed),
            payment_status: Some(PaymentStatus::Paid),
            ..Default::default()
        };
        self.update_reservation(&reservation.confirmation_code, update)
            .await
    }

    pub(super) async fn handle_reservation_cancelled(
        &self,
        payload: Value,
    ) -> Result<WebhookOutcome> {
        let reservation: ReservationRef = parse_payload("reservation.cancelled", payload)?;
        let refunded = reservation
            .refund_amount
            .is_some_and(|amount| amount > Decimal::ZERO);
        let update = OrderUpdate {
            status: Some(OrderStatus::Cancelled),
            payment_status: refunded.then_some(PaymentStatus::Refunded),
            refund_amount: reservation.refund_amount,
            ..Default::default()
        };
        self.update_reservation(&reservation.confirmation_code, update)
            .await
    }

    /// Payouts are not stored; the outcome flags them for revenue
    /// distribution downstream.
    pub(super) fn handle_payout_completed(&self, payload: Value) -> Result<WebhookOutcome> {
        let payout: PayoutCompleted = parse_payload("payout.completed", payload)?;
        info!(
            "[airbnb] payout of {} for listing {} ({} reservations, paid {}), ready for distribution",
            payout.payout_amount,
            payout.listing_id.as_deref().unwrap_or("unknown"),
            payout.reservations.len(),
            payout.payout_date.as_deref().unwrap_or("unknown"),
        );
        Ok(WebhookOutcome {
            payout_amount: Some(payout.payout_amount),
            ready_for_distribution: Some(true),
            ..WebhookOutcome::processed()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;
    use serde_json::json;
    use unibridge_core::events::MockAdapterEventSink;

    use crate::adapter::{AdapterContext, PlatformAdapter};
    use crate::config::AdapterConfig;

    use super::*;

    fn adapter(context: &AdapterContext) -> AirbnbAdapter {
        AirbnbAdapter::new(AdapterConfig::default(), context.clone()).unwrap()
    }

    fn created_payload() -> Value {
        json!({
            "confirmation_code": "HMABC123",
            "listing": {"id": 9001, "name": "Loft in Valencia"},
            "guest": {"id": "g-1", "first_name": "Noa"},
            "start_date": "2026-08-10",
            "end_date": "2026-08-14",
            "total_price": 480
        })
    }

    #[tokio::test]
    async fn test_reservation_lifecycle() {
        let context = AdapterContext::in_memory();
        let adapter = adapter(&context);
        let sink = MockAdapterEventSink::new();
        adapter.state().events().subscribe(Arc::new(sink.clone()));

        let created = adapter
            .handle_webhook("reservation.created", created_payload())
            .await
            .unwrap();
        assert!(created.processed);
        let order = context.orders.get_order("airbnb", "HMABC123").unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items[0].metadata["nights"], 4);
        assert_eq!(order.items[0].external_id, "9001");

        adapter
            .handle_webhook(
                "reservation.confirmed",
                json!({"confirmation_code": "HMABC123"}),
            )
            .await
            .unwrap();
        let order = context.orders.get_order("airbnb", "HMABC123").unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.payment_status, PaymentStatus::Paid);

        adapter
            .handle_webhook(
                "reservation.cancelled",
                json!({"confirmation_code": "HMABC123", "refund_amount": "240.00"}),
            )
            .await
            .unwrap();
        let order = context.orders.get_order("airbnb", "HMABC123").unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.payment_status, PaymentStatus::Refunded);
        assert_eq!(order.refund_amount, Some(dec!(240.00)));

        assert_eq!(sink.names(), vec!["order_created"]);
    }

    #[tokio::test]
    async fn test_cancellation_without_refund_keeps_payment_status() {
        let context = AdapterContext::in_memory();
        let adapter = adapter(&context);
        adapter
            .handle_webhook("reservation.created", created_payload())
            .await
            .unwrap();
        adapter
            .handle_webhook(
                "reservation.cancelled",
                json!({"confirmation_code": "HMABC123", "refund_amount": 0}),
            )
            .await
            .unwrap();

        let order = context.orders.get_order("airbnb", "HMABC123").unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_redelivered_reservation_counts_once() {
        let context = AdapterContext::in_memory();
        let adapter = adapter(&context);
        for _ in 0..3 {
            adapter
                .handle_webhook("reservation.created", created_payload())
                .await
                .unwrap();
        }
        assert_eq!(adapter.state().stats().orders_processed, 1);
        assert_eq!(context.orders.count_orders(Some("airbnb")).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_confirming_unknown_reservation() {
        let context = AdapterContext::in_memory();
        let outcome = adapter(&context)
            .handle_webhook("reservation.confirmed", json!({"confirmation_code": "NOPE"}))
            .await
            .unwrap();
        assert!(!outcome.processed);
    }

    #[tokio::test]
    async fn test_payout_is_ready_for_distribution() {
        let context = AdapterContext::in_memory();
        let outcome = adapter(&context)
            .handle_webhook(
                "payout.completed",
                json!({"listing_id": 9001, "payout_amount": 1250.5, "reservations": [{}, {}]}),
            )
            .await
            .unwrap();

        assert!(outcome.processed);
        assert_eq!(outcome.ready_for_distribution, Some(true));
        assert_eq!(outcome.payout_amount, Some(dec!(1250.5)));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["readyForDistribution"], true);
    }
}
