//! Health state types

use crate::core::providers::FailureKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Circuit breaker state for a provider
///
/// `Healthy -> Degraded` on repeated consecutive failures, then the breaker
/// cools down on a timer. Once the timer elapses the provider enters
/// `Probation` (half-open): a single trial attempt is admitted. Success
/// closes the circuit; failure re-opens it with a longer cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Healthy,
    Degraded,
    CoolingDown,
    Probation,
}

/// Outcome of a single provider attempt
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// The attempt succeeded
    Success {
        /// Total tokens consumed (input + output)
        tokens: u64,
        /// Observed attempt latency
        latency: Duration,
    },
    /// The provider signaled throttling
    RateLimited {
        /// Seconds until the provider expects capacity, when advertised
        retry_after: Option<u64>,
    },
    /// The attempt failed for another reason
    Error { kind: FailureKind },
}

/// Read-only view of a provider's health, consumed by scoring and the admin
/// surface
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    /// Current circuit state
    pub state: CircuitState,
    /// Consecutive failures since the last success
    pub consecutive_failures: u32,
    /// Lifetime successful attempts
    pub success_count: u64,
    /// Lifetime failed attempts (errors and rate limits)
    pub failure_count: u64,
    /// Success rate over the trailing outcome window (1.0 with no history)
    pub reliability: f64,
    /// Rolling average attempt latency in milliseconds
    pub avg_latency_ms: f64,
    /// Attempts recorded within the load window
    pub requests_in_window: u64,
    /// Tokens recorded within the load window
    pub tokens_in_window: u64,
    /// Timestamp of the last successful attempt
    pub last_success: Option<DateTime<Utc>>,
    /// Timestamp of the last rate-limit signal
    pub last_rate_limited: Option<DateTime<Utc>>,
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self {
            state: CircuitState::Healthy,
            consecutive_failures: 0,
            success_count: 0,
            failure_count: 0,
            reliability: 1.0,
            avg_latency_ms: 0.0,
            requests_in_window: 0,
            tokens_in_window: 0,
            last_success: None,
            last_rate_limited: None,
        }
    }
}
