//! Core error types for the integration bridge.
//!
//! Adapters, the orchestrator and storage all report failures through
//! [`Error`]. "Not applicable" operations are not errors and never show up
//! here; see the adapter `Outcome` type in `unibridge-connect`.

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the bridge.
#[derive(Error, Debug)]
pub enum Error {
    /// Platform id has no registered constructor. Raised before any adapter
    /// is built.
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    /// Platform id was never registered with the orchestrator.
    #[error("Adapter not found: {0}")]
    AdapterNotFound(String),

    #[error("Sync already in progress for {0}")]
    SyncInProgress(String),

    /// A contract method the adapter never implemented. This is a
    /// programming error, not a runtime condition.
    #[error("{operation} is not implemented by the {platform} adapter")]
    NotImplemented {
        platform: String,
        operation: &'static str,
    },

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("{platform} request failed: {message}")]
    External { platform: String, message: String },

    #[error("{platform} request timed out")]
    Timeout { platform: String },

    #[error("{platform} rate limit exceeded")]
    RateLimited { platform: String },

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    pub fn not_implemented(platform: impl Into<String>, operation: &'static str) -> Self {
        Error::NotImplemented {
            platform: platform.into(),
            operation,
        }
    }

    pub fn external(platform: impl Into<String>, message: impl Into<String>) -> Self {
        Error::External {
            platform: platform.into(),
            message: message.into(),
        }
    }

    /// Whether a retry at a later time may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::External { .. } | Error::Timeout { .. } | Error::RateLimited { .. }
        )
    }
}

/// Validation errors for canonical entities and inbound payloads.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Price must not be negative (got {0})")]
    NegativePrice(rust_decimal::Decimal),

    #[error("Quantity must be at least 1 (got {0})")]
    InvalidQuantity(u32),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] chrono::ParseError),
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}
