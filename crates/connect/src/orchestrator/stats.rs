//! Bridge counters and the sink that feeds them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use unibridge_core::events::{AdapterEvent, AdapterEventSink, BridgeEvent};

use crate::adapter::HealthReport;

/// Bridge-wide statistics snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStats {
    pub total_syncs: u64,
    pub successful_syncs: u64,
    pub failed_syncs: u64,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub orders_created: u64,
    pub shipments_updated: u64,
    pub webhooks_processed: u64,
    /// Adapters currently reporting a connected status.
    pub active_connections: usize,
    pub registered_adapters: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BridgeHealth {
    pub healthy: bool,
    pub adapters: Vec<HealthReport>,
}

#[derive(Default)]
pub(crate) struct BridgeCounters {
    total_syncs: AtomicU64,
    successful_syncs: AtomicU64,
    failed_syncs: AtomicU64,
    orders_created: AtomicU64,
    shipments_updated: AtomicU64,
    webhooks_processed: AtomicU64,
    last_sync_time: RwLock<Option<DateTime<Utc>>>,
}

impl BridgeCounters {
    pub fn record(&self, event: &AdapterEvent) {
        match event {
            AdapterEvent::SyncComplete { .. } => {
                self.total_syncs.fetch_add(1, Ordering::Relaxed);
                self.successful_syncs.fetch_add(1, Ordering::Relaxed);
                *self
                    .last_sync_time
                    .write()
                    .unwrap_or_else(|p| p.into_inner()) = Some(Utc::now());
            }
            AdapterEvent::SyncError { .. } => {
                self.total_syncs.fetch_add(1, Ordering::Relaxed);
                self.failed_syncs.fetch_add(1, Ordering::Relaxed);
            }
            AdapterEvent::OrderCreated { .. } => {
                self.orders_created.fetch_add(1, Ordering::Relaxed);
            }
            AdapterEvent::ShipmentUpdated { .. } => {
                self.shipments_updated.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn webhook_processed(&self) {
        self.webhooks_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, active_connections: usize, registered_adapters: usize) -> BridgeStats {
        BridgeStats {
            total_syncs: self.total_syncs.load(Ordering::Relaxed),
            successful_syncs: self.successful_syncs.load(Ordering::Relaxed),
            failed_syncs: self.failed_syncs.load(Ordering::Relaxed),
            last_sync_time: *self
                .last_sync_time
                .read()
                .unwrap_or_else(|p| p.into_inner()),
            orders_created: self.orders_created.load(Ordering::Relaxed),
            shipments_updated: self.shipments_updated.load(Ordering::Relaxed),
            webhooks_processed: self.webhooks_processed.load(Ordering::Relaxed),
            active_connections,
            registered_adapters,
        }
    }
}

/// Subscribed to each registered adapter: counts its events and re-emits
/// them on the bridge bus.
pub(crate) struct BridgeForwarder {
    pub counters: std::sync::Arc<BridgeCounters>,
    pub bus: broadcast::Sender<BridgeEvent>,
}

impl AdapterEventSink for BridgeForwarder {
    fn emit(&self, platform_id: &str, event: AdapterEvent) {
        self.counters.record(&event);
        let event = BridgeEvent::new(platform_id, event);
        if self.bus.send(event).is_err() {
            debug!("[{}] no bridge event subscribers", platform_id);
        }
    }
}
