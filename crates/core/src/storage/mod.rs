//! Storage contracts shared by the repository traits, plus an in-memory
//! store used by the server and by tests.

mod memory;

use serde::Serialize;

pub use memory::InMemoryBridgeStore;

/// Result of an upsert: the record as stored after the write, whether the
/// write created it, and whether it changed anything at all.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Upserted<T> {
    pub record: T,
    pub created: bool,
    pub changed: bool,
}

impl<T> Upserted<T> {
    pub fn created(record: T) -> Self {
        Self {
            record,
            created: true,
            changed: true,
        }
    }

    pub fn updated(record: T) -> Self {
        Self {
            record,
            created: false,
            changed: true,
        }
    }

    /// The write was a redelivery and left the stored record as it was.
    pub fn unchanged(record: T) -> Self {
        Self {
            record,
            created: false,
            changed: false,
        }
    }
}
