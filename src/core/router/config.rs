//! Router runtime configuration

use std::time::Duration;

/// Tunables for the fallback loop
///
/// Constructed from the gateway configuration; core logic never reads the
/// environment.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Maximum ranked providers attempted per request
    pub max_fallback_attempts: usize,
    /// Pause before moving on after a rate-limit response
    pub fallback_delay: Duration,
    /// Per-provider attempt timeout (providers may override)
    pub attempt_timeout: Duration,
    /// Window used to project proximity to provider rate limits
    pub rate_limit_window: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_fallback_attempts: 3,
            fallback_delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(60),
            rate_limit_window: Duration::from_secs(60),
        }
    }
}

impl RouterConfig {
    /// Upper bound on one request's routing time: every attempt hitting its
    /// timeout plus every inter-provider delay. The gateway enforces this so
    /// a chain of slow providers cannot hang a request indefinitely.
    pub fn overall_budget(&self) -> Duration {
        let attempts = self.max_fallback_attempts.max(1) as u32;
        self.attempt_timeout * attempts + self.fallback_delay * attempts.saturating_sub(1)
    }
}
