//! Platform catalogue and adapter construction.

mod factory;

pub use factory::{AdapterFactory, PlatformDescriptor};
