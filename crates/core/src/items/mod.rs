//! Items module - canonical synced listings and their repository contract.

mod items_model;
mod items_traits;

pub use items_model::{ItemCondition, NewSyncedItem, SyncStatus, SyncedItem};
pub use items_traits::ItemRepositoryTrait;
