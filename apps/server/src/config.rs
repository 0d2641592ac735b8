use std::{net::SocketAddr, time::Duration};

use unibridge_core::constants::{PLATFORM_AIRBNB, PLATFORM_MAERSK, PLATFORM_VINTED};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    /// Platforms created and connected at startup.
    pub platforms: Vec<String>,
    /// Webhook deliveries accepted per minute, across all platforms.
    pub webhook_rate_limit: u32,
    pub allow_unsigned_webhooks: bool,
    /// Bearer token guarding adapter registration. Open when unset.
    pub admin_token: Option<String>,
    pub enable_sync_jobs: bool,
    pub sync_interval: Duration,
    pub health_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_millis(30_000),
            platforms: vec![
                PLATFORM_VINTED.to_string(),
                PLATFORM_MAERSK.to_string(),
                PLATFORM_AIRBNB.to_string(),
            ],
            webhook_rate_limit: 100,
            allow_unsigned_webhooks: false,
            admin_token: None,
            enable_sync_jobs: true,
            sync_interval: Duration::from_secs(15 * 60),
            health_interval: Duration::from_secs(5 * 60),
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env_var(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env_var(key).map(|v| v.to_ascii_lowercase()) {
        Some(v) => matches!(v.as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

fn env_list(key: &str, default: &[String]) -> Vec<String> {
    match env_var(key) {
        Some(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => default.to_vec(),
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = env_var("BRIDGE_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse()
            .unwrap_or_else(|_| {
                tracing::warn!("Invalid BRIDGE_LISTEN_ADDR, using {}", DEFAULT_LISTEN_ADDR);
                defaults.listen_addr
            });
        let timeout_ms: u64 = env_parse("BRIDGE_REQUEST_TIMEOUT_MS", 30_000);
        let sync_secs: u64 = env_parse(
            "BRIDGE_SYNC_INTERVAL_SECS",
            defaults.sync_interval.as_secs(),
        );
        let health_secs: u64 = env_parse(
            "BRIDGE_HEALTH_INTERVAL_SECS",
            defaults.health_interval.as_secs(),
        );

        Self {
            listen_addr,
            cors_allow: env_list("BRIDGE_CORS_ALLOW_ORIGINS", &defaults.cors_allow),
            request_timeout: Duration::from_millis(timeout_ms),
            platforms: env_list("BRIDGE_PLATFORMS", &defaults.platforms)
                .into_iter()
                .map(|p| p.to_ascii_lowercase())
                .collect(),
            webhook_rate_limit: env_parse("BRIDGE_WEBHOOK_RATE_LIMIT", defaults.webhook_rate_limit),
            allow_unsigned_webhooks: env_bool(
                "BRIDGE_ALLOW_UNSIGNED_WEBHOOKS",
                defaults.allow_unsigned_webhooks,
            ),
            admin_token: env_var("BRIDGE_ADMIN_TOKEN"),
            enable_sync_jobs: env_bool("BRIDGE_ENABLE_SYNC_JOBS", defaults.enable_sync_jobs),
            sync_interval: Duration::from_secs(sync_secs.max(1)),
            health_interval: Duration::from_secs(health_secs.max(1)),
        }
    }
}
