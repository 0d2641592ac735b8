use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info};
use unibridge_core::constants::{PLATFORM_AIRBNB, PLATFORM_MAERSK, PLATFORM_VINTED};
use unibridge_core::errors::{Error, Result};

use crate::adapter::{AdapterContext, PlatformAdapter, PlatformCategory};
use crate::airbnb::{self, AirbnbAdapter};
use crate::config::AdapterConfig;
use crate::maersk::{self, MaerskAdapter};
use crate::vinted::{self, VintedAdapter};

type Constructor = fn(AdapterConfig, AdapterContext) -> Result<Arc<dyn PlatformAdapter>>;
type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Static description of a supported platform.
#[derive(Clone)]
pub struct PlatformDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub category: PlatformCategory,
    /// Credential names read from `<PLATFORM>_<KEY>` variables.
    pub credential_keys: &'static [&'static str],
    construct: Constructor,
}

impl std::fmt::Debug for PlatformDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .finish()
    }
}

impl PlatformDescriptor {
    pub fn new(
        id: &'static str,
        name: &'static str,
        category: PlatformCategory,
        credential_keys: &'static [&'static str],
        construct: Constructor,
    ) -> Self {
        Self {
            id,
            name,
            category,
            credential_keys,
            construct,
        }
    }
}

fn build_vinted(config: AdapterConfig, context: AdapterContext) -> Result<Arc<dyn PlatformAdapter>> {
    Ok(Arc::new(VintedAdapter::new(config, context)?))
}

fn build_maersk(config: AdapterConfig, context: AdapterContext) -> Result<Arc<dyn PlatformAdapter>> {
    Ok(Arc::new(MaerskAdapter::new(config, context)?))
}

fn build_airbnb(config: AdapterConfig, context: AdapterContext) -> Result<Arc<dyn PlatformAdapter>> {
    Ok(Arc::new(AirbnbAdapter::new(config, context)?))
}

/// Builds adapters by platform id.
///
/// Unknown ids are rejected before anything is constructed. Config is merged
/// with the environment here, once, so adapters never read it themselves.
pub struct AdapterFactory {
    context: AdapterContext,
    platforms: BTreeMap<&'static str, PlatformDescriptor>,
    env: EnvLookup,
    allow_unsigned_webhooks: bool,
}

impl AdapterFactory {
    pub fn new(context: AdapterContext) -> Self {
        let mut factory = Self {
            context,
            platforms: BTreeMap::new(),
            env: Arc::new(|key| std::env::var(key).ok()),
            allow_unsigned_webhooks: false,
        };
        factory.register(PlatformDescriptor::new(
            PLATFORM_VINTED,
            "Vinted",
            PlatformCategory::Marketplace,
            vinted::CREDENTIAL_KEYS,
            build_vinted,
        ));
        factory.register(PlatformDescriptor::new(
            PLATFORM_MAERSK,
            "Maersk",
            PlatformCategory::Logistics,
            maersk::CREDENTIAL_KEYS,
            build_maersk,
        ));
        factory.register(PlatformDescriptor::new(
            PLATFORM_AIRBNB,
            "Airbnb",
            PlatformCategory::Rental,
            airbnb::CREDENTIAL_KEYS,
            build_airbnb,
        ));
        factory
    }

    /// Replaces the environment lookup (tests, secret stores).
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    /// Accept unsigned webhooks on every adapter built without a secret.
    pub fn with_unsigned_webhooks(mut self, allow: bool) -> Self {
        self.allow_unsigned_webhooks = allow;
        self
    }

    pub fn register(&mut self, descriptor: PlatformDescriptor) {
        debug!("Registering platform descriptor {}", descriptor.id);
        self.platforms.insert(descriptor.id, descriptor);
    }

    pub fn available_platforms(&self) -> Vec<&PlatformDescriptor> {
        self.platforms.values().collect()
    }

    pub fn is_supported(&self, platform_id: &str) -> bool {
        self.platforms
            .contains_key(platform_id.trim().to_ascii_lowercase().as_str())
    }

    pub fn create(
        &self,
        platform_id: &str,
        config: AdapterConfig,
    ) -> Result<Arc<dyn PlatformAdapter>> {
        let id = platform_id.trim().to_ascii_lowercase();
        let descriptor = self
            .platforms
            .get(id.as_str())
            .ok_or_else(|| Error::UnknownPlatform(platform_id.to_string()))?;

        let env = self.env.clone();
        let mut config = config.merge_env(descriptor.id, descriptor.credential_keys, |key| env(key));
        config.allow_unsigned_webhooks |= self.allow_unsigned_webhooks;

        let adapter = (descriptor.construct)(config, self.context.clone())?;
        info!("Created {} adapter", descriptor.name);
        Ok(adapter)
    }
}
