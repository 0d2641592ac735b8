//! Inventory sync shared by every adapter that has an inventory.

use std::future::Future;
use std::time::Instant;

use chrono::Utc;
use log::{debug, error, info, warn};
use unibridge_core::errors::Result;
use unibridge_core::events::AdapterEvent;
use unibridge_core::items::{ItemRepositoryTrait, NewSyncedItem};

use super::state::AdapterState;
use super::types::{ConnectionMode, ItemFailure, SyncReport};

/// One source record after mapping. Mapping failures stay per item.
pub(crate) struct FetchedItem {
    pub external_id: String,
    pub item: Result<NewSyncedItem>,
}

/// Runs one single-flight sync: takes the guard, fetches, upserts every
/// item, then emits `sync_complete` (or `sync_error` if the fetch failed).
///
/// The guard is taken before `fetch` is first polled, and released on
/// every exit path when it drops.
pub(crate) async fn run_inventory_sync<F>(
    state: &AdapterState,
    items: &dyn ItemRepositoryTrait,
    mode: ConnectionMode,
    fetch: F,
) -> Result<SyncReport>
where
    F: Future<Output = Result<Vec<FetchedItem>>>,
{
    let _guard = state.try_begin_sync()?;
    let platform = state.platform_id();
    let started = Instant::now();
    info!("[{}] starting inventory sync ({:?} mode)", platform, mode);

    let fetched = match fetch.await {
        Ok(fetched) => fetched,
        Err(e) => {
            error!("[{}] inventory sync failed: {}", platform, e);
            state.record_failure();
            state.emit(AdapterEvent::sync_error(e.to_string()));
            return Err(e);
        }
    };

    let items_processed = fetched.len();
    let mut created = 0;
    let mut updated = 0;
    let mut failures = Vec::new();

    for FetchedItem { external_id, item } in fetched {
        let result = match item {
            Ok(item) => items.upsert_item(item).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(upserted) if upserted.created => created += 1,
            Ok(_) => updated += 1,
            Err(e) => {
                warn!("[{}] item {} not synced: {}", platform, external_id, e);
                failures.push(ItemFailure {
                    external_id,
                    error: e.to_string(),
                });
            }
        }
    }

    let items_saved = created + updated;
    let duration_ms = started.elapsed().as_millis() as u64;
    state.add_items_synced(items_saved);
    state.mark_synced(Utc::now());
    state.record_success();
    debug!(
        "[{}] sync persisted {} items ({} created, {} updated, {} failed)",
        platform,
        items_saved,
        created,
        updated,
        failures.len()
    );

    // Emitted only once the whole batch is stored.
    state.emit(AdapterEvent::sync_complete(
        items_saved,
        created,
        updated,
        failures.len(),
        duration_ms,
    ));
    info!(
        "[{}] inventory sync complete: {}/{} items in {}ms",
        platform, items_saved, items_processed, duration_ms
    );

    Ok(SyncReport {
        mode,
        items_processed,
        items_saved,
        created,
        updated,
        failures,
        duration_ms,
    })
}
