//! Airbnb listing shape, mapping and mock listings.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use unibridge_core::constants::{DEFAULT_CURRENCY, PLATFORM_AIRBNB};
use unibridge_core::errors::{Result, ValidationError};
use unibridge_core::items::{ItemCondition, NewSyncedItem};

use crate::adapter::{decimal, string_or_number};

pub const LISTING_CATEGORY: &str = "accommodation";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingPrice {
    #[serde(deserialize_with = "decimal")]
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingPhoto {
    pub large: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AirbnbListing {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub room_type: Option<String>,
    pub price: ListingPrice,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub person_capacity: Option<u32>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub photos: Vec<ListingPhoto>,
    #[serde(default)]
    pub star_rating: Option<f64>,
    #[serde(default)]
    pub reviews_count: Option<u32>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

pub fn to_internal(listing: AirbnbListing) -> NewSyncedItem {
    let coordinates = match (listing.lat, listing.lng) {
        (Some(lat), Some(lng)) => json!({ "lat": lat, "lng": lng }),
        _ => Value::Null,
    };

    let mut metadata = Map::new();
    metadata.insert("propertyType".to_string(), json!(listing.property_type));
    metadata.insert("roomType".to_string(), json!(listing.room_type));
    metadata.insert("bedrooms".to_string(), json!(listing.bedrooms));
    metadata.insert("bathrooms".to_string(), json!(listing.bathrooms));
    metadata.insert("maxGuests".to_string(), json!(listing.person_capacity));
    metadata.insert("amenities".to_string(), json!(listing.amenities));
    metadata.insert(
        "location".to_string(),
        json!({
            "city": listing.city,
            "country": listing.country,
            "coordinates": coordinates,
        }),
    );
    metadata.insert("rating".to_string(), json!(listing.star_rating));
    metadata.insert("reviewCount".to_string(), json!(listing.reviews_count));

    NewSyncedItem {
        platform: PLATFORM_AIRBNB.to_string(),
        external_id: listing.id,
        title: listing.name,
        description: listing.description,
        price: listing.price.amount,
        currency: listing
            .price
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        images: listing.photos.into_iter().map(|p| p.large).collect(),
        category: LISTING_CATEGORY.to_string(),
        condition: ItemCondition::NotApplicable,
        metadata,
    }
}

const PROPERTY_TYPES: [&str; 5] = ["Apartment", "House", "Villa", "Loft", "Condo"];
const CITIES: [&str; 5] = ["Barcelona", "Madrid", "Valencia", "Sevilla", "Mallorca"];

pub fn generate_mock_listings(count: usize) -> Vec<AirbnbListing> {
    (0..count)
        .map(|i| {
            let property_type = PROPERTY_TYPES[i % PROPERTY_TYPES.len()];
            let city = CITIES[i % CITIES.len()];
            AirbnbListing {
                id: format!("airbnb_mock_{}", i),
                name: format!("{} in {}", property_type, city),
                description: Some("Bright stay with every comfort.".to_string()),
                property_type: Some(property_type.to_string()),
                room_type: Some("entire_home".to_string()),
                price: ListingPrice {
                    amount: Decimal::from(80 + i * 20),
                    currency: Some("EUR".to_string()),
                },
                bedrooms: Some(1 + (i % 3) as u32),
                bathrooms: Some(1 + (i % 2) as u32),
                person_capacity: Some(2 + (i * 2) as u32),
                city: Some(city.to_string()),
                country: Some("Spain".to_string()),
                lat: None,
                lng: None,
                photos: vec![ListingPhoto {
                    large: format!("https://picsum.photos/seed/airbnb{}/800/600", i),
                }],
                star_rating: Some(4.0 + ((i * 17) % 90) as f64 / 100.0),
                reviews_count: Some(((i * 41) % 200) as u32),
                amenities: ["WiFi", "Kitchen", "Air Conditioning", "Washing Machine"]
                    .iter()
                    .map(|a| a.to_string())
                    .collect(),
            }
        })
        .collect()
}

fn parse_stay_date(field: &str, value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidInput(format!("{} is not a date: {}", field, value)).into())
}

/// Nights between check-in and check-out; a partial day counts as a night.
pub fn calculate_nights(check_in: &str, check_out: &str) -> Result<i64> {
    let start = parse_stay_date("start_date", check_in)?;
    let end = parse_stay_date("end_date", check_out)?;
    if end < start {
        return Err(ValidationError::InvalidInput(format!(
            "check-out {} is before check-in {}",
            check_out, check_in
        ))
        .into());
    }
    let seconds = (end - start).num_seconds();
    Ok((seconds + 86_399) / 86_400)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nights() {
        assert_eq!(calculate_nights("2026-07-01", "2026-07-05").unwrap(), 4);
        assert_eq!(calculate_nights("2026-07-01", "2026-07-01").unwrap(), 0);
        assert_eq!(
            calculate_nights("2026-07-01T15:00:00Z", "2026-07-03T11:00:00Z").unwrap(),
            2
        );
        assert!(calculate_nights("2026-07-05", "2026-07-01").is_err());
        assert!(calculate_nights("soon", "2026-07-01").is_err());
    }

    #[test]
    fn test_listing_maps_to_accommodation() {
        let listing = generate_mock_listings(3).remove(2);
        let item = to_internal(listing);
        assert_eq!(item.external_id, "airbnb_mock_2");
        assert_eq!(item.title, "Villa in Valencia");
        assert_eq!(item.price, Decimal::from(120));
        assert_eq!(item.category, LISTING_CATEGORY);
        assert_eq!(item.condition, ItemCondition::NotApplicable);
        assert_eq!(item.metadata["location"]["city"], "Valencia");
        assert!(item.metadata["location"]["coordinates"].is_null());
    }

    #[test]
    fn test_mock_listings_are_stable() {
        assert_eq!(generate_mock_listings(4), generate_mock_listings(4));
    }
}
