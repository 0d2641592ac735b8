//! Unibridge Connect - platform adapters and the bridge orchestrator.
//!
//! Every external platform is reached through a [`PlatformAdapter`]. The
//! [`AdapterFactory`] builds adapters from a platform id and configuration,
//! and the [`BridgeOrchestrator`] holds the live set, fans out syncs and
//! re-broadcasts adapter events on one bridge-wide bus.

pub mod adapter;
pub mod airbnb;
pub mod client;
pub mod config;
pub mod maersk;
pub mod orchestrator;
pub mod rate_limiter;
pub mod registry;
pub mod signature;
pub mod vinted;

// Re-export commonly used types
pub use adapter::{
    AdapterContext, AdapterEventHub, AdapterInfo, AdapterState, AdapterStats, AdapterStatus,
    Booking, BookingRequest, ConnectionMode, CreatedOrder, HealthReport, NotApplicable,
    OrderDraft, Outcome, PlatformAdapter, PlatformCategory, PushItemResult, SubscriptionId,
    SyncOptions, SyncReport, TrackingSnapshot, WebhookHeaders, WebhookOutcome,
};
pub use airbnb::AirbnbAdapter;
pub use client::{HttpPlatformClient, PlatformHttpClient};
pub use config::AdapterConfig;
pub use maersk::MaerskAdapter;
pub use orchestrator::{
    BridgeHealth, BridgeOrchestrator, BridgeStats, PlatformSyncResult, LOGISTICS_FALLBACK_ORDER,
};
pub use registry::{AdapterFactory, PlatformDescriptor};
pub use vinted::VintedAdapter;
