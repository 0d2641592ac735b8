//! HMAC-SHA256 webhook signature verification.
//!
//! Senders sign the raw request body with the shared secret and put the hex
//! digest in `x-<platform>-signature`, optionally prefixed with `sha256=`.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use log::warn;
use sha2::Sha256;

use crate::config::AdapterConfig;
use unibridge_core::errors::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Inbound request headers with lowercase names.
pub type WebhookHeaders = HashMap<String, String>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Hex HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Unexpected(format!("Invalid HMAC key: {}", e)))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature against `body`.
pub fn verify(secret: &str, body: &[u8], provided: &str) -> bool {
    let provided = provided.trim();
    let provided = provided.strip_prefix(SIGNATURE_PREFIX).unwrap_or(provided);
    let Ok(expected) = hex::decode(provided) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Signature policy of one adapter.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    platform_id: &'static str,
    header: String,
    secret: Option<String>,
    allow_unsigned: bool,
}

impl WebhookVerifier {
    pub fn new(platform_id: &'static str, config: &AdapterConfig) -> Self {
        Self {
            platform_id,
            header: format!("x-{}-signature", platform_id),
            secret: config
                .webhook_secret
                .clone()
                .filter(|s| !s.trim().is_empty()),
            allow_unsigned: config.allow_unsigned_webhooks,
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header
    }

    /// Without a configured secret every delivery is rejected unless
    /// unsigned webhooks were explicitly allowed.
    pub fn verify(&self, headers: &WebhookHeaders, raw_body: &[u8]) -> bool {
        let Some(secret) = self.secret.as_deref() else {
            if self.allow_unsigned {
                warn!(
                    "[{}] webhook secret not configured, accepting unsigned delivery",
                    self.platform_id
                );
                return true;
            }
            warn!(
                "[{}] webhook secret not configured, rejecting delivery",
                self.platform_id
            );
            return false;
        };

        match headers.get(&self.header) {
            Some(signature) => verify(secret, raw_body, signature),
            None => false,
        }
    }
}
