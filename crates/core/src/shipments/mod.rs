//! Shipments module - logistics tracking records.

mod shipments_model;
mod shipments_traits;

pub use shipments_model::{
    Shipment, ShipmentEvent, ShipmentException, ShipmentStatus, ShipmentUpdate,
};
pub use shipments_traits::ShipmentRepositoryTrait;
