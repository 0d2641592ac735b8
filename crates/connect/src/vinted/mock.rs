//! Deterministic listings served in mock mode.

use rust_decimal::Decimal;

use super::mapping::{VintedItem, VintedPhoto};

const BRANDS: [&str; 6] = ["Nike", "Zara", "H&M", "Adidas", "Mango", "Pull&Bear"];
const CONDITIONS: [&str; 4] = ["new_with_tags", "new_without_tags", "very_good", "good"];

/// Same `count`, same listings: ids and prices are derived from the index so
/// repeated mock syncs upsert instead of duplicating.
pub fn generate_mock_items(count: usize) -> Vec<VintedItem> {
    (0..count)
        .map(|i| {
            let brand = BRANDS[i % BRANDS.len()];
            let cents = 1000 + ((i * 733) % 5000) as i64;
            VintedItem {
                id: format!("vinted_mock_{}", i),
                title: format!("{} garment - size M", brand),
                description: Some("Item in excellent condition, barely used.".to_string()),
                price: Decimal::new(cents, 2),
                currency: Some("EUR".to_string()),
                photos: vec![VintedPhoto {
                    url: format!("https://picsum.photos/seed/{}/400/400", i),
                }],
                catalog_id: Some(((i % 6) + 1).to_string()),
                brand_title: Some(brand.to_string()),
                size_title: Some("M".to_string()),
                color1: Some("Black".to_string()),
                status: Some(CONDITIONS[i % CONDITIONS.len()].to_string()),
                url: None,
                view_count: Some(((i * 37) % 500) as u64),
                favourite_count: Some(((i * 11) % 50) as u64),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_items_are_stable() {
        let first = generate_mock_items(5);
        let second = generate_mock_items(5);
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
        assert_eq!(first[1].brand_title.as_deref(), Some("Zara"));
        assert!(first
            .iter()
            .all(|item| item.price >= Decimal::new(10, 0) && item.price < Decimal::new(60, 0)));
    }
}
