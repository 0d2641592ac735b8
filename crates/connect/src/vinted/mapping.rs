//! Vinted listing shapes and the vocabulary tables between Vinted and the
//! internal catalog.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use unibridge_core::constants::{DEFAULT_CURRENCY, MONEY_DECIMAL_PRECISION, PLATFORM_VINTED};
use unibridge_core::errors::{Result, ValidationError};
use unibridge_core::items::{ItemCondition, NewSyncedItem};

use crate::adapter::{decimal, opt_string_or_number, string_or_number};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VintedPhoto {
    pub url: String,
}

/// A listing as returned by the Vinted API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VintedItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "decimal")]
    pub price: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub photos: Vec<VintedPhoto>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub catalog_id: Option<String>,
    #[serde(default)]
    pub brand_title: Option<String>,
    #[serde(default)]
    pub size_title: Option<String>,
    #[serde(default)]
    pub color1: Option<String>,
    /// Item condition in Vinted's vocabulary.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub favourite_count: Option<u64>,
}

/// Outbound listing body for `POST /items`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VintedListing {
    pub title: String,
    pub description: Option<String>,
    pub price: String,
    pub currency: String,
    pub photos: Vec<VintedPhoto>,
    pub catalog_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_title: Option<String>,
    pub status: String,
}

const CATEGORIES: [(&str, &str); 6] = [
    ("1", "womens_clothing"),
    ("2", "mens_clothing"),
    ("3", "kids_clothing"),
    ("4", "shoes"),
    ("5", "bags"),
    ("6", "accessories"),
];

pub const FALLBACK_CATEGORY: &str = "other";
pub const FALLBACK_CATALOG_ID: &str = "1";

pub fn map_category(catalog_id: Option<&str>) -> &'static str {
    catalog_id
        .and_then(|id| CATEGORIES.iter().find(|(vinted, _)| *vinted == id.trim()))
        .map(|(_, internal)| *internal)
        .unwrap_or(FALLBACK_CATEGORY)
}

pub fn reverse_map_category(category: &str) -> &'static str {
    CATEGORIES
        .iter()
        .find(|(_, internal)| *internal == category)
        .map(|(vinted, _)| *vinted)
        .unwrap_or(FALLBACK_CATALOG_ID)
}

/// Unknown or missing conditions read as `good`.
pub fn map_condition(status: Option<&str>) -> ItemCondition {
    match status.map(str::trim) {
        Some("new_with_tags") => ItemCondition::NewWithTags,
        Some("new_without_tags") => ItemCondition::NewWithoutTags,
        Some("very_good") => ItemCondition::VeryGood,
        Some("satisfactory") => ItemCondition::Satisfactory,
        _ => ItemCondition::Good,
    }
}

pub fn reverse_map_condition(condition: ItemCondition) -> &'static str {
    match condition {
        ItemCondition::NewWithTags => "new_with_tags",
        ItemCondition::NewWithoutTags => "new_without_tags",
        ItemCondition::VeryGood => "very_good",
        ItemCondition::Satisfactory => "satisfactory",
        ItemCondition::Good | ItemCondition::NotApplicable => "good",
    }
}

fn insert_opt<T: Into<Value>>(metadata: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        metadata.insert(key.to_string(), value.into());
    }
}

pub fn to_internal(item: VintedItem) -> NewSyncedItem {
    let category = map_category(item.catalog_id.as_deref()).to_string();
    let condition = map_condition(item.status.as_deref());

    let mut metadata = Map::new();
    insert_opt(&mut metadata, "brand", item.brand_title);
    insert_opt(&mut metadata, "size", item.size_title);
    insert_opt(&mut metadata, "color", item.color1);
    insert_opt(&mut metadata, "originalUrl", item.url);
    insert_opt(&mut metadata, "views", item.view_count);
    insert_opt(&mut metadata, "favorites", item.favourite_count);
    insert_opt(&mut metadata, "catalogId", item.catalog_id);

    NewSyncedItem {
        platform: PLATFORM_VINTED.to_string(),
        external_id: item.id,
        title: item.title,
        description: item.description,
        price: item.price,
        currency: item
            .currency
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        images: item.photos.into_iter().map(|p| p.url).collect(),
        category,
        condition,
        metadata,
    }
}

fn metadata_str(metadata: &Map<String, Value>, key: &str) -> Option<String> {
    metadata.get(key).and_then(Value::as_str).map(str::to_string)
}

pub fn to_external(item: &NewSyncedItem) -> Result<VintedListing> {
    if item.title.trim().is_empty() {
        return Err(ValidationError::MissingField("title".to_string()).into());
    }
    if item.price < Decimal::ZERO {
        return Err(ValidationError::NegativePrice(item.price).into());
    }

    Ok(VintedListing {
        title: item.title.clone(),
        description: item.description.clone(),
        price: item
            .price
            .round_dp(MONEY_DECIMAL_PRECISION)
            .to_string(),
        currency: item.currency.clone(),
        photos: item
            .images
            .iter()
            .map(|url| VintedPhoto { url: url.clone() })
            .collect(),
        catalog_id: reverse_map_category(&item.category).to_string(),
        brand_title: metadata_str(&item.metadata, "brand"),
        size_title: metadata_str(&item.metadata, "size"),
        status: reverse_map_condition(item.condition).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sample() -> VintedItem {
        serde_json::from_value(json!({
            "id": 98123,
            "title": "Zara coat",
            "price": "24.90",
            "photos": [{"url": "https://img/1.jpg"}],
            "catalog_id": 4,
            "brand_title": "Zara",
            "size_title": "M",
            "status": "very_good",
            "view_count": 12
        }))
        .unwrap()
    }

    #[test]
    fn test_category_table_round_trips_known_ids() {
        for (id, slug) in CATEGORIES {
            assert_eq!(map_category(Some(id)), slug);
            assert_eq!(reverse_map_category(slug), id);
        }
        assert_eq!(map_category(Some("999")), FALLBACK_CATEGORY);
        assert_eq!(map_category(None), FALLBACK_CATEGORY);
        assert_eq!(reverse_map_category("furniture"), FALLBACK_CATALOG_ID);
    }

    #[test]
    fn test_condition_table() {
        assert_eq!(map_condition(Some("new_with_tags")), ItemCondition::NewWithTags);
        assert_eq!(map_condition(Some("satisfactory")), ItemCondition::Satisfactory);
        assert_eq!(map_condition(Some("worn_out")), ItemCondition::Good);
        assert_eq!(map_condition(None), ItemCondition::Good);
        assert_eq!(reverse_map_condition(ItemCondition::VeryGood), "very_good");
    }

    #[test]
    fn test_to_internal() {
        let item = to_internal(sample());
        assert_eq!(item.platform, "vinted");
        assert_eq!(item.external_id, "98123");
        assert_eq!(item.price, dec!(24.90));
        assert_eq!(item.currency, "EUR");
        assert_eq!(item.category, "shoes");
        assert_eq!(item.condition, ItemCondition::VeryGood);
        assert_eq!(item.images, vec!["https://img/1.jpg".to_string()]);
        assert_eq!(item.metadata["brand"], "Zara");
        assert_eq!(item.metadata["views"], 12);
        assert!(!item.metadata.contains_key("favorites"));
    }

    #[test]
    fn test_to_external_keeps_brand_and_condition() {
        let listing = to_external(&to_internal(sample())).unwrap();
        assert_eq!(listing.catalog_id, "4");
        assert_eq!(listing.price, "24.90");
        assert_eq!(listing.status, "very_good");
        assert_eq!(listing.brand_title.as_deref(), Some("Zara"));
    }

    #[test]
    fn test_to_external_rejects_untitled_items() {
        let mut item = to_internal(sample());
        item.title = "  ".to_string();
        assert!(to_external(&item).is_err());
    }
}
