//! Gateway configuration
//!
//! One explicit configuration tree with a named field for every tunable,
//! loaded from YAML with environment overrides applied in `apply_env` only.
//! Core components receive plain structs built from this tree and never read
//! the environment themselves.

use crate::core::cost::{CostAlerts, PricingEntry, PricingTable};
use crate::core::health::HealthTrackerConfig;
use crate::core::providers::Provider;
use crate::core::router::RouterConfig;
use crate::core::scoring::RoutingStrategy;
use crate::error::GatewayError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub router: RouterSettings,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub pricing: Vec<PricingRule>,
    #[serde(default)]
    pub alerts: AlertSettings,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen host
    pub host: String,
    /// Listen port
    pub port: u16,
    /// In-flight request cap; excess requests are rejected with 429
    pub max_concurrent_requests: usize,
    /// Hard ceiling applied to every request's max_tokens
    pub max_tokens_ceiling: u32,
    /// Optional static bearer token required on the messages/admin endpoints
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_concurrent_requests: 100,
            max_tokens_ceiling: 8192,
            api_key: None,
        }
    }
}

/// Routing and health tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterSettings {
    /// Routing strategy at startup
    pub strategy: RoutingStrategy,
    /// Maximum ranked providers attempted per request
    pub max_fallback_attempts: usize,
    /// Milliseconds to pause before the next provider after a rate limit
    pub fallback_delay_ms: u64,
    /// Per-provider attempt timeout in seconds
    pub attempt_timeout_secs: u64,
    /// Window in seconds for rate-limit proximity detection
    pub rate_limit_window_secs: u64,
    /// Consecutive failures before a provider's circuit opens
    pub degraded_threshold: u32,
    /// Initial circuit cooldown in seconds
    pub cooldown_secs: u64,
    /// Cap for the doubling circuit cooldown in seconds
    pub cooldown_max_secs: u64,
    /// Trailing attempts used for the reliability rate
    pub reliability_window: usize,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            strategy: RoutingStrategy::Intelligent,
            max_fallback_attempts: 3,
            fallback_delay_ms: 1000,
            attempt_timeout_secs: 60,
            rate_limit_window_secs: 60,
            degraded_threshold: 3,
            cooldown_secs: 30,
            cooldown_max_secs: 240,
            reliability_window: 50,
        }
    }
}

/// One configured provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Unique provider name
    pub name: String,
    /// Endpoint base URL
    pub base_url: String,
    /// Bearer token forwarded to the provider
    #[serde(default)]
    pub api_key: Option<String>,
    /// Ordered alias -> native model mappings
    pub models: Vec<ModelMapping>,
    /// Requests-per-minute limit the provider enforces
    #[serde(default)]
    pub rpm_limit: Option<u64>,
    /// Tokens-per-minute limit the provider enforces
    #[serde(default)]
    pub tpm_limit: Option<u64>,
    /// Per-attempt timeout override in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// External alias to native model name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelMapping {
    pub alias: String,
    pub model: String,
}

/// Price entry for one provider+model pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PricingRule {
    pub provider: String,
    pub model: String,
    /// USD per million input tokens
    pub input_price_per_million: Decimal,
    /// USD per million output tokens
    pub output_price_per_million: Decimal,
}

/// Cost alert thresholds in USD
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlertSettings {
    pub hourly_cost_threshold: Option<Decimal>,
    pub daily_cost_threshold: Option<Decimal>,
}

impl Config {
    /// Load configuration from a YAML file and apply environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let mut config: Config = serde_yaml::from_str(&raw)?;
        config.apply_env();
        config.validate()?;
        debug!(providers = config.providers.len(), "configuration loaded");
        Ok(config)
    }

    /// Apply environment overrides. This is the only place the environment
    /// is read.
    pub fn apply_env(&mut self) {
        if let Ok(host) = env::var("GATEWAY_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("GATEWAY_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("ignoring invalid GATEWAY_PORT"),
            }
        }
        if let Ok(key) = env::var("GATEWAY_API_KEY") {
            self.server.api_key = Some(key);
        }
        if let Ok(strategy) = env::var("ROUTING_STRATEGY") {
            match strategy.parse() {
                Ok(strategy) => self.router.strategy = strategy,
                Err(err) => warn!("ignoring invalid ROUTING_STRATEGY: {err}"),
            }
        }
        if let Ok(attempts) = env::var("MAX_FALLBACK_ATTEMPTS") {
            match attempts.parse() {
                Ok(attempts) => self.router.max_fallback_attempts = attempts,
                Err(_) => warn!("ignoring invalid MAX_FALLBACK_ATTEMPTS"),
            }
        }
    }

    fn validate(&self) -> Result<(), GatewayError> {
        let mut seen = std::collections::HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.name.as_str()) {
                return Err(GatewayError::Config(format!(
                    "duplicate provider name '{}'",
                    provider.name
                )));
            }
            if provider.models.is_empty() {
                return Err(GatewayError::Config(format!(
                    "provider '{}' maps no models",
                    provider.name
                )));
            }
        }
        if self.router.max_fallback_attempts == 0 {
            return Err(GatewayError::Config(
                "max_fallback_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Router runtime configuration derived from the settings.
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            max_fallback_attempts: self.router.max_fallback_attempts,
            fallback_delay: Duration::from_millis(self.router.fallback_delay_ms),
            attempt_timeout: Duration::from_secs(self.router.attempt_timeout_secs),
            rate_limit_window: Duration::from_secs(self.router.rate_limit_window_secs),
        }
    }

    /// Health tracker configuration derived from the settings.
    pub fn health_config(&self) -> HealthTrackerConfig {
        HealthTrackerConfig {
            degraded_threshold: self.router.degraded_threshold,
            cooldown: Duration::from_secs(self.router.cooldown_secs),
            cooldown_max: Duration::from_secs(self.router.cooldown_max_secs),
            load_window: Duration::from_secs(self.router.rate_limit_window_secs),
            retention: Duration::from_secs(3600),
            reliability_window: self.router.reliability_window,
        }
    }

    /// Pricing table assembled from the pricing rules.
    pub fn pricing_table(&self) -> PricingTable {
        let mut table = PricingTable::new();
        for rule in &self.pricing {
            table.insert(
                rule.provider.clone(),
                rule.model.clone(),
                PricingEntry {
                    input_price_per_million: rule.input_price_per_million,
                    output_price_per_million: rule.output_price_per_million,
                },
            );
        }
        table
    }

    /// Cost alert thresholds.
    pub fn cost_alerts(&self) -> CostAlerts {
        CostAlerts {
            hourly_threshold: self.alerts.hourly_cost_threshold,
            daily_threshold: self.alerts.daily_cost_threshold,
        }
    }
}

impl ProviderConfig {
    /// Immutable provider descriptor for the registry.
    pub fn to_provider(&self) -> Provider {
        Provider {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            model_map: self
                .models
                .iter()
                .map(|mapping| (mapping.alias.clone(), mapping.model.clone()))
                .collect(),
            rpm_limit: self.rpm_limit,
            tpm_limit: self.tpm_limit,
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}
