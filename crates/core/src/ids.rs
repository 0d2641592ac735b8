//! Deterministic id derivation for canonical entities.
//!
//! Internal ids are UUIDv5 values over `kind:platform:external_id`, so the
//! same external record always maps to the same internal id no matter how
//! many times it is synced or which process syncs it.

use uuid::Uuid;

/// Namespace for every id the bridge derives.
const BRIDGE_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6b, 0x1f, 0x4e, 0x2a, 0x93, 0xd0, 0x4c, 0x71, 0x8a, 0x55, 0x0e, 0x3c, 0x27, 0xb4, 0x19, 0xf6,
]);

fn derive(kind: &str, platform: &str, external_id: &str) -> String {
    let name = format!("{}:{}:{}", kind, platform, external_id);
    Uuid::new_v5(&BRIDGE_NAMESPACE, name.as_bytes()).to_string()
}

pub fn item_id(platform: &str, external_id: &str) -> String {
    derive("item", platform, external_id)
}

pub fn order_id(platform: &str, external_order_id: &str) -> String {
    derive("order", platform, external_order_id)
}

pub fn party_id(platform: &str, external_user_id: &str) -> String {
    derive("party", platform, external_user_id)
}

pub fn shipment_id(platform: &str, tracking_number: &str) -> String {
    derive("shipment", platform, tracking_number)
}
