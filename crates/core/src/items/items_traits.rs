use crate::errors::Result;
use crate::items::items_model::{NewSyncedItem, SyncedItem};
use crate::storage::Upserted;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Trait for synced item persistence.
///
/// Items are keyed by `(platform, external_id)`. Implementations must make
/// `upsert_item` atomic per key so concurrent syncs never create duplicates.
#[async_trait]
pub trait ItemRepositoryTrait: Send + Sync {
    async fn upsert_item(&self, item: NewSyncedItem) -> Result<Upserted<SyncedItem>>;

    /// Merges `patch` into the stored item's metadata. Returns `None` when the
    /// item has never been synced.
    async fn merge_item_metadata(
        &self,
        platform: &str,
        external_id: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<SyncedItem>>;

    fn get_item(&self, platform: &str, external_id: &str) -> Result<Option<SyncedItem>>;
    fn list_items(&self, platform: &str) -> Result<Vec<SyncedItem>>;
    fn count_items(&self, platform: Option<&str>) -> Result<usize>;
}
