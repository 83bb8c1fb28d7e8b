//! Application state shared across HTTP handlers
//!
//! Everything the handlers touch hangs off this struct; there is no ambient
//! global state anywhere in the gateway.

use crate::config::Config;
use crate::core::cost::CostAccountant;
use crate::core::health::HealthTracker;
use crate::core::providers::{HttpBackend, ProviderRegistry};
use crate::core::router::FallbackRouter;
use crate::error::Result;
use crate::server::stats::GatewayStats;
use std::sync::Arc;
use tracing::info;

/// Shared resources for the HTTP server
#[derive(Clone)]
pub struct AppState {
    /// Gateway configuration (read-only after startup)
    pub config: Arc<Config>,
    /// Provider registry, resolved at startup
    pub registry: Arc<ProviderRegistry>,
    /// Per-provider rolling health
    pub health: Arc<HealthTracker>,
    /// Usage log and cost totals
    pub costs: Arc<CostAccountant>,
    /// Fallback router
    pub router: Arc<FallbackRouter>,
    /// Gateway request counters
    pub stats: Arc<GatewayStats>,
}

impl AppState {
    /// Build the full component graph from configuration, registering an
    /// HTTP backend for every configured provider.
    pub fn from_config(config: Config) -> Result<Self> {
        let mut registry = ProviderRegistry::new();
        for provider_config in &config.providers {
            let backend = HttpBackend::new(
                provider_config.name.clone(),
                &provider_config.base_url,
                provider_config.api_key.clone(),
            );
            registry.register(provider_config.to_provider(), Arc::new(backend));
            info!(
                provider = %provider_config.name,
                base_url = %provider_config.base_url,
                models = provider_config.models.len(),
                "provider registered"
            );
        }

        let health = Arc::new(HealthTracker::new(config.health_config()));
        let costs = Arc::new(CostAccountant::new(
            config.pricing_table(),
            config.cost_alerts(),
        ));
        let registry = Arc::new(registry);
        let router = Arc::new(FallbackRouter::new(
            Arc::clone(&registry),
            Arc::clone(&health),
            Arc::clone(&costs),
            config.router_config(),
            config.router.strategy,
        ));

        Ok(Self {
            config: Arc::new(config),
            registry,
            health,
            costs,
            router,
            stats: Arc::new(GatewayStats::new()),
        })
    }

    /// Assemble state from pre-built components. Used by tests to inject
    /// fake backends.
    pub fn new(
        config: Config,
        registry: Arc<ProviderRegistry>,
        health: Arc<HealthTracker>,
        costs: Arc<CostAccountant>,
        router: Arc<FallbackRouter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            health,
            costs,
            router,
            stats: Arc::new(GatewayStats::new()),
        }
    }
}
