//! Domain events module.
//!
//! Adapters describe what happened on their platform with [`AdapterEvent`]
//! and hand it to an [`AdapterEventSink`]. The orchestrator wraps each one in
//! a [`BridgeEvent`] tagged with the platform id before broadcasting it.

mod domain_event;
mod sink;

pub use domain_event::*;
pub use sink::*;
