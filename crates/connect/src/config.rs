//! Per-adapter configuration.
//!
//! A config blob arrives from the operator (or is empty) and is merged with
//! environment variables exactly once, when the factory builds the adapter.
//! Adapters never read the environment themselves.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default timeout for outbound platform requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default outbound request budget per adapter.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterConfig {
    pub base_url: Option<String>,
    /// Opaque credentials keyed by snake_case name (`access_token`, `client_id`, ...).
    pub credentials: HashMap<String, String>,
    pub webhook_secret: Option<String>,
    /// Accept webhook deliveries when no secret is configured.
    pub allow_unsigned_webhooks: bool,
    pub timeout_secs: u64,
    pub requests_per_minute: u32,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            credentials: HashMap::new(),
            webhook_secret: None,
            allow_unsigned_webhooks: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AdapterConfig {
    pub fn with_credential(mut self, key: &str, value: impl Into<String>) -> Self {
        self.credentials.insert(key.to_string(), value.into());
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    /// Returns a credential, treating blank values as missing.
    pub fn credential(&self, key: &str) -> Option<&str> {
        self.credentials
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Fills unset values from `<PLATFORM>_<KEY>` variables.
    ///
    /// Explicit config always wins over the environment.
    pub fn merge_env<F>(mut self, platform_id: &str, credential_keys: &[&str], lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = platform_id.to_ascii_uppercase();
        for key in credential_keys {
            if self.credential(key).is_some() {
                continue;
            }
            let var = format!("{}_{}", prefix, key.to_ascii_uppercase());
            if let Some(value) = non_empty(lookup(&var)) {
                self.credentials.insert((*key).to_string(), value);
            }
        }
        if non_empty(self.webhook_secret.clone()).is_none() {
            self.webhook_secret = non_empty(lookup(&format!("{}_WEBHOOK_SECRET", prefix)));
        }
        if non_empty(self.base_url.clone()).is_none() {
            self.base_url = non_empty(lookup(&format!("{}_BASE_URL", prefix)));
        }
        self
    }
}
