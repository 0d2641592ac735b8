use std::sync::Arc;

use unibridge_core::items::ItemRepositoryTrait;
use unibridge_core::orders::OrderRepositoryTrait;
use unibridge_core::shipments::ShipmentRepositoryTrait;
use unibridge_core::storage::InMemoryBridgeStore;

/// Persistence collaborators handed to every adapter.
#[derive(Clone)]
pub struct AdapterContext {
    pub items: Arc<dyn ItemRepositoryTrait>,
    pub orders: Arc<dyn OrderRepositoryTrait>,
    pub shipments: Arc<dyn ShipmentRepositoryTrait>,
}

impl AdapterContext {
    pub fn new(
        items: Arc<dyn ItemRepositoryTrait>,
        orders: Arc<dyn OrderRepositoryTrait>,
        shipments: Arc<dyn ShipmentRepositoryTrait>,
    ) -> Self {
        Self {
            items,
            orders,
            shipments,
        }
    }

    /// Context backed by a single in-memory store.
    pub fn from_store(store: Arc<InMemoryBridgeStore>) -> Self {
        Self {
            items: store.clone(),
            orders: store.clone(),
            shipments: store,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryBridgeStore::new()))
    }
}
