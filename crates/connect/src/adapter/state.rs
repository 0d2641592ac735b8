//! Runtime state shared by every adapter implementation.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use unibridge_core::errors::{Error, Result};
use unibridge_core::events::AdapterEvent;

use super::events::AdapterEventHub;
use crate::rate_limiter::TokenBucket;

/// Connectivity status of an adapter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdapterStatus {
    Disconnected,
    Connected,
    /// Connected without credentials; data is fabricated locally.
    ConnectedMock,
    Error,
    RateLimited,
}

impl AdapterStatus {
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            AdapterStatus::Connected | AdapterStatus::ConnectedMock | AdapterStatus::RateLimited
        )
    }
}

impl fmt::Display for AdapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterStatus::Disconnected => write!(f, "disconnected"),
            AdapterStatus::Connected => write!(f, "connected"),
            AdapterStatus::ConnectedMock => write!(f, "connected_mock"),
            AdapterStatus::Error => write!(f, "error"),
            AdapterStatus::RateLimited => write!(f, "rate_limited"),
        }
    }
}

/// Snapshot of an adapter's counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdapterStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub items_synced: u64,
    pub orders_processed: u64,
}

/// Clears the in-progress flag when dropped, on every exit path.
pub struct SyncGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct AdapterState {
    platform_id: &'static str,
    status: RwLock<AdapterStatus>,
    last_sync: RwLock<Option<DateTime<Utc>>>,
    sync_in_progress: AtomicBool,
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    items_synced: AtomicU64,
    orders_processed: AtomicU64,
    limiter: TokenBucket,
    events: AdapterEventHub,
}

impl AdapterState {
    pub fn new(platform_id: &'static str, requests_per_minute: u32) -> Self {
        Self {
            platform_id,
            status: RwLock::new(AdapterStatus::Disconnected),
            last_sync: RwLock::new(None),
            sync_in_progress: AtomicBool::new(false),
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            items_synced: AtomicU64::new(0),
            orders_processed: AtomicU64::new(0),
            limiter: TokenBucket::per_minute(requests_per_minute),
            events: AdapterEventHub::new(),
        }
    }

    pub fn platform_id(&self) -> &'static str {
        self.platform_id
    }

    fn status_read(&self) -> RwLockReadGuard<'_, AdapterStatus> {
        self.status.read().unwrap_or_else(|poisoned| {
            warn!("[{}] status lock was poisoned, recovering", self.platform_id);
            poisoned.into_inner()
        })
    }

    fn status_write(&self) -> RwLockWriteGuard<'_, AdapterStatus> {
        self.status.write().unwrap_or_else(|poisoned| {
            warn!("[{}] status lock was poisoned, recovering", self.platform_id);
            poisoned.into_inner()
        })
    }

    pub fn status(&self) -> AdapterStatus {
        *self.status_read()
    }

    pub fn set_status(&self, status: AdapterStatus) {
        *self.status_write() = status;
    }

    pub fn is_mock(&self) -> bool {
        self.status() == AdapterStatus::ConnectedMock
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.read().unwrap_or_else(|p| p.into_inner())
    }

    pub fn mark_synced(&self, at: DateTime<Utc>) {
        *self.last_sync.write().unwrap_or_else(|p| p.into_inner()) = Some(at);
    }

    /// Sets the in-progress flag, or fails if it is already set.
    ///
    /// Must be called before any `.await` in a sync so two overlapping calls
    /// cannot both pass the check.
    pub fn try_begin_sync(&self) -> Result<SyncGuard<'_>> {
        self.sync_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::SyncInProgress(self.platform_id.to_string()))?;
        Ok(SyncGuard {
            flag: &self.sync_in_progress,
        })
    }

    pub fn is_syncing(&self) -> bool {
        self.sync_in_progress.load(Ordering::Acquire)
    }

    pub fn record_success(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_result<T>(&self, result: &Result<T>) {
        match result {
            Ok(_) => self.record_success(),
            Err(_) => self.record_failure(),
        }
    }

    pub fn add_items_synced(&self, count: usize) {
        self.items_synced.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn add_order_processed(&self) {
        self.orders_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> AdapterStats {
        AdapterStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            items_synced: self.items_synced.load(Ordering::Relaxed),
            orders_processed: self.orders_processed.load(Ordering::Relaxed),
        }
    }

    /// Takes an outbound request slot. Marks the adapter rate limited when
    /// the bucket is empty.
    pub fn acquire_request_slot(&self) -> Result<()> {
        if self.limiter.try_acquire() {
            let mut status = self.status_write();
            if *status == AdapterStatus::RateLimited {
                *status = AdapterStatus::Connected;
            }
            return Ok(());
        }
        warn!(
            "[{}] outbound rate limit reached, retry in {:?}",
            self.platform_id,
            self.limiter.time_until_available()
        );
        self.set_status(AdapterStatus::RateLimited);
        Err(Error::RateLimited {
            platform: self.platform_id.to_string(),
        })
    }

    pub fn events(&self) -> &AdapterEventHub {
        &self.events
    }

    pub fn emit(&self, event: AdapterEvent) {
        self.events.emit(self.platform_id, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_sync_is_rejected_while_guard_held() {
        let state = AdapterState::new("vinted", 60);
        let guard = state.try_begin_sync().unwrap();
        assert!(state.is_syncing());

        let second = state.try_begin_sync();
        assert!(matches!(second, Err(Error::SyncInProgress(_))));

        drop(guard);
        assert!(!state.is_syncing());
        assert!(state.try_begin_sync().is_ok());
    }

    #[test]
    fn test_guard_is_released_on_panic() {
        let state = AdapterState::new("vinted", 60);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = state.try_begin_sync().unwrap();
            panic!("sync blew up");
        }));
        assert!(result.is_err());
        assert!(!state.is_syncing());
    }

    #[test]
    fn test_counters() {
        let state = AdapterState::new("airbnb", 60);
        state.record_success();
        state.record_failure();
        state.add_items_synced(5);
        state.add_order_processed();

        let stats = state.stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.successful_requests, 1);
        assert_eq!(stats.failed_requests, 1);
        assert_eq!(stats.items_synced, 5);
        assert_eq!(stats.orders_processed, 1);
    }

    #[test]
    fn test_exhausted_bucket_marks_rate_limited() {
        let state = AdapterState::new("maersk", 1);
        state.set_status(AdapterStatus::Connected);
        assert!(state.acquire_request_slot().is_ok());
        assert!(state.acquire_request_slot().is_err());
        assert_eq!(state.status(), AdapterStatus::RateLimited);
    }
}
