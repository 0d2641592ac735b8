//! Synced item domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Result, ValidationError};
use crate::ids;

/// Item condition in the internal catalog vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    NewWithTags,
    NewWithoutTags,
    VeryGood,
    #[default]
    Good,
    Satisfactory,
    /// Listings where condition has no meaning (accommodation, services).
    NotApplicable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Pending,
    Synced,
    Error,
    OutOfSync,
}

/// An external listing mapped into the internal catalog shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncedItem {
    pub id: String,
    pub platform: String,
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub images: Vec<String>,
    pub category: String,
    pub condition: ItemCondition,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub sync_status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input model produced by an adapter's inbound mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewSyncedItem {
    pub platform: String,
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: String,
    pub condition: ItemCondition,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl NewSyncedItem {
    /// Deterministic internal id for this listing.
    pub fn internal_id(&self) -> String {
        ids::item_id(&self.platform, &self.external_id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.platform.trim().is_empty() {
            return Err(ValidationError::MissingField("platform".to_string()).into());
        }
        if self.external_id.trim().is_empty() {
            return Err(ValidationError::MissingField("externalId".to_string()).into());
        }
        if self.price < Decimal::ZERO {
            return Err(ValidationError::NegativePrice(self.price).into());
        }
        Ok(())
    }

    /// Builds the stored record for a first insert.
    pub fn into_item(self, now: DateTime<Utc>) -> SyncedItem {
        SyncedItem {
            id: self.internal_id(),
            platform: self.platform,
            external_id: self.external_id,
            title: self.title,
            description: self.description,
            price: self.price,
            currency: self.currency,
            images: self.images,
            category: self.category,
            condition: self.condition,
            metadata: self.metadata,
            sync_status: SyncStatus::Synced,
            last_synced_at: Some(now),
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl SyncedItem {
    /// Overwrites the synced fields in place, keeping id and creation time.
    /// Metadata keys set locally (e.g. reservations) survive unless the
    /// source sends the same key.
    pub fn apply(&mut self, incoming: NewSyncedItem, now: DateTime<Utc>) {
        self.title = incoming.title;
        self.description = incoming.description;
        self.price = incoming.price;
        self.currency = incoming.currency;
        self.images = incoming.images;
        self.category = incoming.category;
        self.condition = incoming.condition;
        for (key, value) in incoming.metadata {
            self.metadata.insert(key, value);
        }
        self.sync_status = SyncStatus::Synced;
        self.last_synced_at = Some(now);
        self.last_error = None;
        self.updated_at = now;
    }
}

impl From<&SyncedItem> for NewSyncedItem {
    fn from(item: &SyncedItem) -> Self {
        NewSyncedItem {
            platform: item.platform.clone(),
            external_id: item.external_id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            price: item.price,
            currency: item.currency.clone(),
            images: item.images.clone(),
            category: item.category.clone(),
            condition: item.condition,
            metadata: item.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> NewSyncedItem {
        NewSyncedItem {
            platform: "vinted".to_string(),
            external_id: "1001".to_string(),
            title: "Denim jacket".to_string(),
            description: None,
            price: dec!(25.00),
            currency: "EUR".to_string(),
            images: vec![],
            category: "mens_clothing".to_string(),
            condition: ItemCondition::VeryGood,
            metadata: Map::new(),
        }
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let mut item = sample();
        item.price = dec!(-1);
        assert!(item.validate().is_err());

        item.price = Decimal::ZERO;
        assert!(item.validate().is_ok());
    }

    #[test]
    fn test_missing_external_id_is_rejected() {
        let mut item = sample();
        item.external_id = "  ".to_string();
        assert!(item.validate().is_err());
    }

    #[test]
    fn test_apply_keeps_identity_and_local_metadata() {
        let created = Utc::now();
        let mut stored = sample().into_item(created);
        stored
            .metadata
            .insert("reserved".to_string(), Value::Bool(true));

        let mut incoming = sample();
        incoming.title = "Vintage denim jacket".to_string();
        stored.apply(incoming, Utc::now());

        assert_eq!(stored.id, ids::item_id("vinted", "1001"));
        assert_eq!(stored.title, "Vintage denim jacket");
        assert_eq!(stored.created_at, created);
        assert_eq!(stored.metadata.get("reserved"), Some(&Value::Bool(true)));
    }
}
