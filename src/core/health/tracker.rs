//! Rolling per-provider health tracker

use super::types::{AttemptOutcome, CircuitState, HealthSnapshot};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Health tracker tunables
#[derive(Debug, Clone)]
pub struct HealthTrackerConfig {
    /// Consecutive failures before the circuit opens
    pub degraded_threshold: u32,
    /// Initial cooldown duration after the circuit opens
    pub cooldown: Duration,
    /// Cap for the doubling cooldown
    pub cooldown_max: Duration,
    /// Window used for `current_load` and rate-limit proximity
    pub load_window: Duration,
    /// How long window entries are retained before pruning
    pub retention: Duration,
    /// Number of trailing outcomes used for the reliability rate
    pub reliability_window: usize,
}

impl Default for HealthTrackerConfig {
    fn default() -> Self {
        Self {
            degraded_threshold: 3,
            cooldown: Duration::from_secs(30),
            cooldown_max: Duration::from_secs(240),
            load_window: Duration::from_secs(60),
            retention: Duration::from_secs(3600),
            reliability_window: 50,
        }
    }
}

/// Mutable per-provider state, owned by the tracker
#[derive(Debug)]
struct ProviderHealthState {
    /// (arrival, tokens) per attempt, pruned past the retention horizon
    window: VecDeque<(Instant, u64)>,
    /// Trailing attempt outcomes, true = success
    recent: VecDeque<bool>,
    consecutive_failures: u32,
    success_count: u64,
    failure_count: u64,
    /// Rolling average latency in microseconds (EMA, alpha = 1/5)
    avg_latency_us: u64,
    state: CircuitState,
    cooldown_until: Option<Instant>,
    current_cooldown: Duration,
    last_success: Option<DateTime<Utc>>,
    last_rate_limited: Option<DateTime<Utc>>,
}

impl ProviderHealthState {
    fn new(cooldown: Duration) -> Self {
        Self {
            window: VecDeque::new(),
            recent: VecDeque::new(),
            consecutive_failures: 0,
            success_count: 0,
            failure_count: 0,
            avg_latency_us: 0,
            state: CircuitState::Healthy,
            cooldown_until: None,
            current_cooldown: cooldown,
            last_success: None,
            last_rate_limited: None,
        }
    }

    fn reliability(&self) -> f64 {
        if self.recent.is_empty() {
            return 1.0;
        }
        let successes = self.recent.iter().filter(|ok| **ok).count();
        successes as f64 / self.recent.len() as f64
    }

    fn load_within(&self, window: Duration, now: Instant) -> (u64, u64) {
        let mut requests = 0u64;
        let mut tokens = 0u64;
        for (at, t) in self.window.iter().rev() {
            if now.duration_since(*at) > window {
                break;
            }
            requests += 1;
            tokens += t;
        }
        (requests, tokens)
    }
}

/// Tracks rolling usage, failures, and circuit state per provider
///
/// State lives in a `DashMap` keyed by provider name, so concurrent
/// `record_attempt` calls on different providers never contend and calls on
/// the same provider serialize on its entry. The tracker itself never fails:
/// recording is infallible and a provider with no history reads as healthy.
pub struct HealthTracker {
    config: HealthTrackerConfig,
    states: DashMap<String, ProviderHealthState>,
}

impl HealthTracker {
    pub fn new(config: HealthTrackerConfig) -> Self {
        Self {
            config,
            states: DashMap::new(),
        }
    }

    /// Record the outcome of one provider attempt.
    ///
    /// Must be called exactly once per attempt; fallbacks to other providers
    /// are separate attempts against those providers' own state.
    pub fn record_attempt(&self, provider: &str, outcome: AttemptOutcome) {
        let now = Instant::now();
        let mut entry = self
            .states
            .entry(provider.to_string())
            .or_insert_with(|| ProviderHealthState::new(self.config.cooldown));
        let state = entry.value_mut();

        while let Some((at, _)) = state.window.front() {
            if now.duration_since(*at) > self.config.retention {
                state.window.pop_front();
            } else {
                break;
            }
        }

        match outcome {
            AttemptOutcome::Success { tokens, latency } => {
                state.window.push_back((now, tokens));
                self.push_recent(state, true);
                state.consecutive_failures = 0;
                state.success_count += 1;
                state.last_success = Some(Utc::now());

                let latency_us = latency.as_micros() as u64;
                state.avg_latency_us = if state.avg_latency_us == 0 {
                    latency_us
                } else {
                    (latency_us + 4 * state.avg_latency_us) / 5
                };

                if state.state != CircuitState::Healthy {
                    debug!(provider, "circuit closed after successful attempt");
                }
                state.state = CircuitState::Healthy;
                state.cooldown_until = None;
                state.current_cooldown = self.config.cooldown;
            }
            AttemptOutcome::RateLimited { retry_after } => {
                state.window.push_back((now, 0));
                state.last_rate_limited = Some(Utc::now());
                debug!(provider, ?retry_after, "rate limit recorded");
                self.record_failure(provider, state, now);
            }
            AttemptOutcome::Error { kind } => {
                state.window.push_back((now, 0));
                debug!(provider, ?kind, "failure recorded");
                self.record_failure(provider, state, now);
            }
        }
    }

    fn record_failure(&self, provider: &str, state: &mut ProviderHealthState, now: Instant) {
        self.push_recent(state, false);
        state.consecutive_failures += 1;
        state.failure_count += 1;

        match state.state {
            CircuitState::Probation => {
                // Failed trial: re-open with a longer cooldown, capped.
                state.current_cooldown =
                    (state.current_cooldown * 2).min(self.config.cooldown_max);
                state.cooldown_until = Some(now + state.current_cooldown);
                state.state = CircuitState::CoolingDown;
                warn!(
                    provider,
                    cooldown_secs = state.current_cooldown.as_secs_f64(),
                    "probation attempt failed, circuit re-opened"
                );
            }
            CircuitState::Healthy => {
                if state.consecutive_failures >= self.config.degraded_threshold {
                    state.cooldown_until = Some(now + state.current_cooldown);
                    state.state = CircuitState::Degraded;
                    warn!(
                        provider,
                        consecutive_failures = state.consecutive_failures,
                        cooldown_secs = state.current_cooldown.as_secs_f64(),
                        "provider degraded, circuit opened"
                    );
                }
            }
            // In-flight attempts that started before the trip still land
            // here; they must not extend the deadline.
            CircuitState::Degraded | CircuitState::CoolingDown => {}
        }
    }

    fn push_recent(&self, state: &mut ProviderHealthState, ok: bool) {
        state.recent.push_back(ok);
        if state.recent.len() > self.config.reliability_window {
            state.recent.pop_front();
        }
    }

    /// Whether the provider's consecutive failures have reached the breaker
    /// threshold. Monotonic non-decreasing until a success resets it.
    pub fn is_degraded(&self, provider: &str) -> bool {
        self.states
            .get(provider)
            .map(|state| state.consecutive_failures >= self.config.degraded_threshold)
            .unwrap_or(false)
    }

    /// Whether the provider may receive an attempt right now.
    ///
    /// Providers with an open circuit are excluded until their cooldown
    /// elapses; the first check after the deadline flips the provider into
    /// probation and admits it.
    pub fn is_eligible(&self, provider: &str) -> bool {
        let Some(mut entry) = self.states.get_mut(provider) else {
            // Never-seen providers are optimistically eligible.
            return true;
        };
        let state = entry.value_mut();

        match state.state {
            CircuitState::Healthy | CircuitState::Probation => true,
            CircuitState::Degraded | CircuitState::CoolingDown => match state.cooldown_until {
                Some(deadline) if Instant::now() >= deadline => {
                    state.state = CircuitState::Probation;
                    debug!(provider, "cooldown elapsed, admitting probation attempt");
                    true
                }
                Some(_) => {
                    state.state = CircuitState::CoolingDown;
                    false
                }
                None => true,
            },
        }
    }

    /// Requests and estimated tokens recorded within `window`.
    pub fn current_load(&self, provider: &str, window: Duration) -> (u64, u64) {
        self.states
            .get(provider)
            .map(|state| state.load_within(window, Instant::now()))
            .unwrap_or((0, 0))
    }

    /// Point-in-time view of a provider's health. Providers without history
    /// read as healthy defaults.
    pub fn snapshot(&self, provider: &str) -> HealthSnapshot {
        let now = Instant::now();
        self.states
            .get(provider)
            .map(|state| {
                let (requests, tokens) = state.load_within(self.config.load_window, now);
                HealthSnapshot {
                    state: state.state,
                    consecutive_failures: state.consecutive_failures,
                    success_count: state.success_count,
                    failure_count: state.failure_count,
                    reliability: state.reliability(),
                    avg_latency_ms: state.avg_latency_us as f64 / 1000.0,
                    requests_in_window: requests,
                    tokens_in_window: tokens,
                    last_success: state.last_success,
                    last_rate_limited: state.last_rate_limited,
                }
            })
            .unwrap_or_default()
    }

    pub fn config(&self) -> &HealthTrackerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::providers::FailureKind;

    fn tracker(cooldown_ms: u64) -> HealthTracker {
        HealthTracker::new(HealthTrackerConfig {
            degraded_threshold: 3,
            cooldown: Duration::from_millis(cooldown_ms),
            cooldown_max: Duration::from_millis(cooldown_ms * 8),
            ..Default::default()
        })
    }

    fn success() -> AttemptOutcome {
        AttemptOutcome::Success {
            tokens: 100,
            latency: Duration::from_millis(200),
        }
    }

    fn error() -> AttemptOutcome {
        AttemptOutcome::Error {
            kind: FailureKind::ServerError,
        }
    }

    #[test]
    fn test_unknown_provider_is_optimistically_healthy() {
        let tracker = tracker(1000);
        assert!(tracker.is_eligible("never-seen"));
        assert!(!tracker.is_degraded("never-seen"));

        let snapshot = tracker.snapshot("never-seen");
        assert_eq!(snapshot.state, CircuitState::Healthy);
        assert_eq!(snapshot.reliability, 1.0);
    }

    #[test]
    fn test_degraded_after_threshold_and_monotonic() {
        let tracker = tracker(1000);

        tracker.record_attempt("p", error());
        tracker.record_attempt("p", error());
        assert!(!tracker.is_degraded("p"));
        assert!(tracker.is_eligible("p"));

        tracker.record_attempt("p", error());
        assert!(tracker.is_degraded("p"));
        assert!(!tracker.is_eligible("p"));

        // Further failures keep it degraded.
        tracker.record_attempt("p", error());
        assert!(tracker.is_degraded("p"));
    }

    #[test]
    fn test_success_resets_consecutive_failures() {
        let tracker = tracker(1000);

        tracker.record_attempt("p", error());
        tracker.record_attempt("p", error());
        tracker.record_attempt("p", success());
        assert!(!tracker.is_degraded("p"));
        assert_eq!(tracker.snapshot("p").consecutive_failures, 0);
    }

    #[test]
    fn test_rate_limit_counts_toward_breaker_and_timestamps() {
        let tracker = tracker(1000);

        for _ in 0..3 {
            tracker.record_attempt("p", AttemptOutcome::RateLimited { retry_after: Some(30) });
        }
        assert!(tracker.is_degraded("p"));
        assert!(tracker.snapshot("p").last_rate_limited.is_some());
    }

    #[tokio::test]
    async fn test_cooldown_elapses_into_probation_then_healthy() {
        let tracker = tracker(20);

        for _ in 0..3 {
            tracker.record_attempt("p", error());
        }
        assert!(!tracker.is_eligible("p"));

        tokio::time::sleep(Duration::from_millis(40)).await;

        // First check after the deadline admits a probation attempt.
        assert!(tracker.is_eligible("p"));
        assert_eq!(tracker.snapshot("p").state, CircuitState::Probation);

        tracker.record_attempt("p", success());
        assert_eq!(tracker.snapshot("p").state, CircuitState::Healthy);
        assert!(tracker.is_eligible("p"));
    }

    #[tokio::test]
    async fn test_failed_probation_doubles_cooldown() {
        let tracker = tracker(40);

        for _ in 0..3 {
            tracker.record_attempt("p", error());
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(tracker.is_eligible("p"));

        // Probe fails: cooldown doubles to ~80ms.
        tracker.record_attempt("p", error());
        assert!(!tracker.is_eligible("p"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!tracker.is_eligible("p"), "still cooling after 50ms of ~80ms");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(tracker.is_eligible("p"));
    }

    #[test]
    fn test_current_load_counts_requests_and_tokens() {
        let tracker = tracker(1000);

        tracker.record_attempt("p", success());
        tracker.record_attempt("p", success());
        tracker.record_attempt("p", error());

        let (requests, tokens) = tracker.current_load("p", Duration::from_secs(60));
        assert_eq!(requests, 3);
        assert_eq!(tokens, 200);
    }

    #[test]
    fn test_latency_moving_average() {
        let tracker = tracker(1000);

        tracker.record_attempt(
            "p",
            AttemptOutcome::Success {
                tokens: 1,
                latency: Duration::from_millis(10),
            },
        );
        assert_eq!(tracker.snapshot("p").avg_latency_ms, 10.0);

        tracker.record_attempt(
            "p",
            AttemptOutcome::Success {
                tokens: 1,
                latency: Duration::from_millis(20),
            },
        );
        // EMA: (20 + 4 * 10) / 5 = 12
        assert_eq!(tracker.snapshot("p").avg_latency_ms, 12.0);
    }

    #[test]
    fn test_reliability_from_trailing_window() {
        let tracker = tracker(1000);

        tracker.record_attempt("p", success());
        tracker.record_attempt("p", success());
        tracker.record_attempt("p", success());
        tracker.record_attempt("p", error());

        assert_eq!(tracker.snapshot("p").reliability, 0.75);
    }
}
