use std::sync::Arc;

use crate::{
    config::Config,
    events::{spawn_bridge_forwarder, EventBus},
    rate_limit::FixedWindowLimiter,
    scheduler::SyncScheduler,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use unibridge_connect::{
    AdapterConfig, AdapterContext, AdapterFactory, BridgeOrchestrator, PlatformAdapter,
};
use unibridge_core::storage::InMemoryBridgeStore;

const EVENT_BUS_CAPACITY: usize = 256;

pub struct AppState {
    pub orchestrator: Arc<BridgeOrchestrator>,
    pub factory: Arc<AdapterFactory>,
    pub store: Arc<InMemoryBridgeStore>,
    pub scheduler: Arc<SyncScheduler>,
    pub event_bus: EventBus,
    pub webhook_limiter: FixedWindowLimiter,
    pub admin_token: Option<String>,
}

pub fn init_tracing() {
    let log_format = std::env::var("BRIDGE_LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let store = Arc::new(InMemoryBridgeStore::new());
    let context = AdapterContext::from_store(store.clone());
    let factory = Arc::new(
        AdapterFactory::new(context).with_unsigned_webhooks(config.allow_unsigned_webhooks),
    );
    if config.allow_unsigned_webhooks {
        tracing::warn!("Unsigned webhook deliveries are accepted for platforms without a secret");
    }

    let orchestrator = Arc::new(BridgeOrchestrator::new());
    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    spawn_bridge_forwarder(orchestrator.subscribe(), event_bus.clone());

    for platform in &config.platforms {
        // Unknown ids in BRIDGE_PLATFORMS are a startup error.
        let adapter = factory.create(platform, AdapterConfig::default())?;
        match adapter.connect().await {
            Ok(mode) => tracing::info!("[{}] connected ({:?} mode)", platform, mode),
            Err(e) => tracing::warn!("[{}] connect failed, registering anyway: {}", platform, e),
        }
        orchestrator.register_adapter(adapter.platform_id(), adapter);
    }

    let scheduler = Arc::new(SyncScheduler::new(orchestrator.clone(), event_bus.clone()));
    if config.enable_sync_jobs {
        scheduler.register_default_jobs(config.sync_interval, config.health_interval);
    } else {
        tracing::info!("Scheduled sync jobs disabled");
    }

    Ok(Arc::new(AppState {
        orchestrator,
        factory,
        store,
        scheduler,
        event_bus,
        webhook_limiter: FixedWindowLimiter::per_minute(config.webhook_rate_limit),
        admin_token: config.admin_token.clone(),
    }))
}
