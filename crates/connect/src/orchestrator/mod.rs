//! Bridge orchestrator: the live adapter set and the bridge-wide event bus.

mod bridge;
mod stats;

pub use bridge::{BridgeOrchestrator, PlatformSyncResult, LOGISTICS_FALLBACK_ORDER};
pub use stats::{BridgeHealth, BridgeStats};
