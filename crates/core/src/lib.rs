//! Unibridge Core - canonical entities, events and storage contracts.
//!
//! This crate holds everything the bridge knows about items, orders and
//! shipments independent of any external platform. Platform adapters in
//! `unibridge-connect` map their payloads into these types and persist them
//! through the repository traits defined here.

pub mod constants;
pub mod errors;
pub mod events;
pub mod ids;
pub mod items;
pub mod orders;
pub mod shipments;
pub mod storage;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
