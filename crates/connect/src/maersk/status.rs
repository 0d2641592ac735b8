//! Carrier status vocabulary.

use unibridge_core::shipments::ShipmentStatus;

/// Maersk event names and the canonical status each one means.
pub const STATUS_TABLE: [(&str, ShipmentStatus); 10] = [
    ("Gate in (Out)", ShipmentStatus::PickedUp),
    ("Gate in", ShipmentStatus::PickedUp),
    ("Loaded", ShipmentStatus::InTransit),
    ("Departed", ShipmentStatus::InTransit),
    ("Arrived", ShipmentStatus::ArrivedAtPort),
    ("Discharged", ShipmentStatus::OutForDelivery),
    ("Gate out", ShipmentStatus::OutForDelivery),
    ("Delivered", ShipmentStatus::Delivered),
    ("Hold", ShipmentStatus::Exception),
    ("Lost", ShipmentStatus::Exception),
];

/// Maps a Maersk event name. Anything unrecognised is `in_transit`.
pub fn map_status(native: &str) -> ShipmentStatus {
    let native = native.trim();
    STATUS_TABLE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(native))
        .map(|(_, status)| *status)
        .unwrap_or(ShipmentStatus::InTransit)
}

/// Native event name used when reporting a canonical status back.
pub fn reverse_map_status(status: ShipmentStatus) -> &'static str {
    match status {
        ShipmentStatus::Pending => "Booked",
        ShipmentStatus::PickedUp => "Gate in",
        ShipmentStatus::InTransit => "Departed",
        ShipmentStatus::ArrivedAtPort => "Arrived",
        ShipmentStatus::OutForDelivery => "Gate out",
        ShipmentStatus::Delivered => "Delivered",
        ShipmentStatus::Exception => "Hold",
        ShipmentStatus::Cancelled => "Cancelled",
    }
}

/// Accepts either a canonical status (`arrived_at_port`) or a Maersk event
/// name (`Arrived`).
pub fn parse_status(value: &str) -> ShipmentStatus {
    serde_json::from_value(serde_json::Value::String(value.trim().to_string()))
        .unwrap_or_else(|_| map_status(value))
}
