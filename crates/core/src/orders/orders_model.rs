//! Order domain models and lifecycle rules.

use std::fmt;

use chrono::{DateTime, Utc};
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Result, ValidationError};
use crate::ids;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    fn progress(self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Confirmed => 1,
            OrderStatus::Processing => 2,
            OrderStatus::Shipped => 3,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Forward-only lifecycle. Cancellation and refund are only reachable
    /// from `pending` or `confirmed`; terminal states never move.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match next {
            OrderStatus::Cancelled | OrderStatus::Refunded => {
                matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
            }
            _ => next.progress() > self.progress(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// A failed payment may still be retried into `paid`; `refunded` is final.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Refunded, _) => false,
            (_, Refunded) => true,
            (Pending, Paid) | (Pending, Failed) | (Failed, Paid) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    Pending,
    Held,
    Released,
    Refunded,
}

impl EscrowStatus {
    pub fn can_transition_to(self, next: EscrowStatus) -> bool {
        use EscrowStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Pending, Held) | (Pending, Refunded) | (Held, Released) | (Held, Refunded) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Escrow {
    pub status: EscrowStatus,
    pub amount: Decimal,
    pub currency: String,
}

/// Buyer or seller on an external platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub external_id: String,
    pub internal_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Party {
    pub fn new(platform: &str, external_id: impl Into<String>) -> Self {
        let external_id = external_id.into();
        Self {
            internal_id: ids::party_id(platform, &external_id),
            external_id,
            name: None,
            email: None,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub external_id: String,
    pub internal_id: String,
    pub title: String,
    pub quantity: u32,
    pub price: Decimal,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl OrderLine {
    pub fn new(
        platform: &str,
        external_id: impl Into<String>,
        title: impl Into<String>,
        price: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        let external_id = external_id.into();
        Self {
            internal_id: ids::item_id(platform, &external_id),
            external_id,
            title: title.into(),
            quantity: 1,
            price,
            currency: currency.into(),
            metadata: Map::new(),
        }
    }
}

/// Canonical order as stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub platform: String,
    pub external_order_id: String,
    pub buyer: Party,
    pub seller: Option<Party>,
    pub items: Vec<OrderLine>,
    pub total_amount: Decimal,
    pub shipping_cost: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub escrow: Option<Escrow>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub refund_amount: Option<Decimal>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input model for creating (or re-delivering) an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub platform: String,
    pub external_order_id: String,
    pub buyer: Party,
    pub seller: Option<Party>,
    pub items: Vec<OrderLine>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub shipping_cost: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub escrow: Option<Escrow>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Partial update carried by follow-up webhooks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub escrow_status: Option<EscrowStatus>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub refund_amount: Option<Decimal>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl NewOrder {
    pub fn internal_id(&self) -> String {
        ids::order_id(&self.platform, &self.external_order_id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.external_order_id.trim().is_empty() {
            return Err(ValidationError::MissingField("externalOrderId".to_string()).into());
        }
        if self.buyer.external_id.trim().is_empty() {
            return Err(ValidationError::MissingField("buyer.externalId".to_string()).into());
        }
        for line in &self.items {
            if line.quantity < 1 {
                return Err(ValidationError::InvalidQuantity(line.quantity).into());
            }
            if line.price < Decimal::ZERO {
                return Err(ValidationError::NegativePrice(line.price).into());
            }
        }
        for amount in [self.total_amount, self.shipping_cost] {
            if amount < Decimal::ZERO {
                return Err(ValidationError::NegativePrice(amount).into());
            }
        }
        Ok(())
    }

    pub fn into_order(self, now: DateTime<Utc>) -> Order {
        Order {
            id: self.internal_id(),
            platform: self.platform,
            external_order_id: self.external_order_id,
            buyer: self.buyer,
            seller: self.seller,
            items: self.items,
            total_amount: self.total_amount,
            shipping_cost: self.shipping_cost,
            currency: self.currency,
            status: self.status,
            payment_status: self.payment_status,
            escrow: self.escrow,
            tracking_number: self.tracking_number,
            carrier: self.carrier,
            refund_amount: None,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Order {
    fn advance_status(&mut self, next: OrderStatus) {
        if self.status.can_transition_to(next) {
            self.status = next;
        } else {
            debug!(
                "Order {} keeps status {} (ignored transition to {})",
                self.id, self.status, next
            );
        }
    }

    fn advance_payment(&mut self, next: PaymentStatus) {
        if self.payment_status.can_transition_to(next) {
            self.payment_status = next;
        } else {
            debug!(
                "Order {} keeps payment status {:?} (ignored transition to {:?})",
                self.id, self.payment_status, next
            );
        }
    }

    fn advance_escrow(&mut self, next: EscrowStatus) {
        if let Some(escrow) = self.escrow.as_mut() {
            if escrow.status.can_transition_to(next) {
                escrow.status = next;
            }
        }
    }

    /// Merges a re-delivered or late creation event into the stored order.
    /// Details are refreshed; statuses only move forward.
    pub fn merge(&mut self, incoming: NewOrder, now: DateTime<Utc>) {
        self.buyer = incoming.buyer;
        if incoming.seller.is_some() {
            self.seller = incoming.seller;
        }
        if !incoming.items.is_empty() {
            self.items = incoming.items;
        }
        self.total_amount = incoming.total_amount;
        self.shipping_cost = incoming.shipping_cost;
        self.currency = incoming.currency;
        self.advance_status(incoming.status);
        self.advance_payment(incoming.payment_status);
        match (self.escrow.is_some(), incoming.escrow) {
            (false, Some(escrow)) => self.escrow = Some(escrow),
            (true, Some(escrow)) => self.advance_escrow(escrow.status),
            _ => {}
        }
        if incoming.tracking_number.is_some() {
            self.tracking_number = incoming.tracking_number;
        }
        if incoming.carrier.is_some() {
            self.carrier = incoming.carrier;
        }
        for (key, value) in incoming.metadata {
            self.metadata.insert(key, value);
        }
        self.updated_at = now;
    }

    pub fn apply_update(&mut self, update: OrderUpdate, now: DateTime<Utc>) {
        if let Some(status) = update.status {
            self.advance_status(status);
        }
        if let Some(payment_status) = update.payment_status {
            self.advance_payment(payment_status);
        }
        if let Some(escrow_status) = update.escrow_status {
            self.advance_escrow(escrow_status);
        }
        if update.tracking_number.is_some() {
            self.tracking_number = update.tracking_number;
        }
        if update.carrier.is_some() {
            self.carrier = update.carrier;
        }
        if update.refund_amount.is_some() {
            self.refund_amount = update.refund_amount;
        }
        for (key, value) in update.metadata {
            self.metadata.insert(key, value);
        }
        self.updated_at = now;
    }
}
