//! Adapter capability contract and the state every adapter shares.

mod context;
mod events;
mod payload;
mod state;
mod sync;
mod traits;
mod types;

pub use context::AdapterContext;
pub use events::{AdapterEventHub, SubscriptionId};
pub use state::{AdapterState, AdapterStats, AdapterStatus, SyncGuard};
pub use traits::PlatformAdapter;
pub use types::*;

pub use crate::signature::WebhookHeaders;

pub(crate) use payload::{
    decimal, opt_decimal, opt_string_or_number, parse_decimal, parse_payload, string_or_number,
};
pub(crate) use sync::{run_inventory_sync, FetchedItem};
