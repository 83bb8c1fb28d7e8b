//! Provider registry
//!
//! Maps provider names to backend implementations, resolved once at startup.
//! Registration order is preserved and used as the deterministic tie-break in
//! ranking, so iteration order matters.

use super::ProviderBackend;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Static description of a configured provider
///
/// Immutable after configuration load.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Unique provider name (e.g. "vertex", "openrouter")
    pub name: String,
    /// Endpoint base URL
    pub base_url: String,
    /// Ordered alias -> native model name pairs
    pub model_map: Vec<(String, String)>,
    /// Requests-per-minute limit, when the provider advertises one
    pub rpm_limit: Option<u64>,
    /// Tokens-per-minute limit, when the provider advertises one
    pub tpm_limit: Option<u64>,
    /// Per-attempt timeout override
    pub timeout: Option<Duration>,
}

impl Provider {
    /// Resolve an external model alias to this provider's native model name.
    pub fn native_model(&self, alias: &str) -> Option<&str> {
        self.model_map
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, native)| native.as_str())
    }

    /// All aliases this provider serves, in configuration order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.model_map.iter().map(|(alias, _)| alias.as_str())
    }
}

/// A provider paired with its backend implementation
pub struct RegisteredProvider {
    pub provider: Provider,
    pub backend: Arc<dyn ProviderBackend>,
}

/// Registry of provider backends, keyed by name
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<RegisteredProvider>,
    index: HashMap<String, usize>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider backend.
    ///
    /// Re-registering an existing name replaces the backend but keeps the
    /// original registration position.
    pub fn register(&mut self, provider: Provider, backend: Arc<dyn ProviderBackend>) {
        let name = provider.name.clone();
        match self.index.get(&name) {
            Some(&pos) => {
                self.providers[pos] = RegisteredProvider { provider, backend };
            }
            None => {
                self.index.insert(name, self.providers.len());
                self.providers.push(RegisteredProvider { provider, backend });
            }
        }
    }

    /// Look up a registered provider by name.
    pub fn get(&self, name: &str) -> Option<&RegisteredProvider> {
        self.index.get(name).map(|&pos| &self.providers[pos])
    }

    /// Backend for a provider name.
    pub fn backend(&self, name: &str) -> Option<Arc<dyn ProviderBackend>> {
        self.get(name).map(|entry| Arc::clone(&entry.backend))
    }

    /// Iterate providers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredProvider> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
