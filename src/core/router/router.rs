//! Fallback execution over the ranked provider list

use super::config::RouterConfig;
use super::error::{AttemptFailure, NoEligibleReason, RouterError};
use crate::core::cost::{CostAccountant, UsageRecord};
use crate::core::health::{AttemptOutcome, HealthTracker};
use crate::core::providers::{
    BackendError, BackendResponse, FailureKind, ProviderRegistry, RegisteredProvider,
};
use crate::core::scoring::{Candidate, ProviderScore, RoutingStrategy, ScoringEngine};
use crate::core::types::RequestContext;
use arc_swap::ArcSwap;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of a successfully routed request
#[derive(Debug)]
pub struct RoutedResponse {
    /// The completion from the winning provider
    pub response: BackendResponse,
    /// Provider that served the request
    pub provider: String,
    /// Native model that served the request
    pub model: String,
    /// Attempts made, including the successful one
    pub attempts: u32,
    /// Failures that preceded the success, in attempt order
    pub failed_attempts: Vec<AttemptFailure>,
    /// Wall-clock time across the whole fallback sequence
    pub latency: Duration,
}

impl RoutedResponse {
    /// Whether the winning provider was not the first-ranked choice.
    pub fn used_fallback(&self) -> bool {
        self.attempts > 1
    }

    /// How many attempts were rejected with a rate limit.
    pub fn rate_limited_attempts(&self) -> usize {
        self.failed_attempts
            .iter()
            .filter(|attempt| attempt.kind == FailureKind::RateLimited)
            .count()
    }
}

/// Executes requests against the ranked provider list with bounded fallback
///
/// Owned by the gateway's top-level state and shared by reference into every
/// request task; holds no global state.
pub struct FallbackRouter {
    registry: Arc<ProviderRegistry>,
    health: Arc<HealthTracker>,
    costs: Arc<CostAccountant>,
    engine: ScoringEngine,
    strategy: ArcSwap<RoutingStrategy>,
    config: RouterConfig,
}

impl FallbackRouter {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        health: Arc<HealthTracker>,
        costs: Arc<CostAccountant>,
        config: RouterConfig,
        strategy: RoutingStrategy,
    ) -> Self {
        Self {
            registry,
            health,
            costs,
            engine: ScoringEngine::new(),
            strategy: ArcSwap::from_pointee(strategy),
            config,
        }
    }

    /// Currently selected routing strategy.
    pub fn strategy(&self) -> RoutingStrategy {
        **self.strategy.load()
    }

    /// Switch the routing strategy at runtime.
    pub fn set_strategy(&self, strategy: RoutingStrategy) {
        info!(%strategy, "routing strategy updated");
        self.strategy.store(Arc::new(strategy));
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Assemble scoring candidates for the requested alias.
    ///
    /// Providers lacking a model mapping are excluded before ranking;
    /// providers excluded by the circuit breaker are filtered here as well,
    /// so rate-limit proximity stays a soft scoring signal while degradation
    /// is a hard exclusion.
    fn build_candidates(&self, ctx: &RequestContext) -> Result<Vec<Candidate>, RouterError> {
        let mut mapped = 0usize;
        let mut candidates = Vec::new();

        for entry in self.registry.iter() {
            let Some(native_model) = entry.provider.native_model(&ctx.model_alias) else {
                continue;
            };
            mapped += 1;

            if !self.health.is_eligible(&entry.provider.name) {
                debug!(
                    provider = %entry.provider.name,
                    request_id = %ctx.request_id,
                    "provider excluded by circuit breaker"
                );
                continue;
            }

            let estimated_cost = self.costs.estimate_cost(
                &entry.provider.name,
                native_model,
                ctx.estimated_input_tokens(),
                u64::from(ctx.max_tokens),
            );

            candidates.push(Candidate {
                provider: entry.provider.name.clone(),
                native_model: native_model.to_string(),
                health: self.health.snapshot(&entry.provider.name),
                load_fraction: self.load_fraction(entry),
                estimated_cost,
            });
        }

        if mapped == 0 {
            return Err(RouterError::NoEligibleProvider {
                model: ctx.model_alias.clone(),
                reason: NoEligibleReason::UnmappedModel,
            });
        }
        if candidates.is_empty() {
            return Err(RouterError::NoEligibleProvider {
                model: ctx.model_alias.clone(),
                reason: NoEligibleReason::AllProvidersDegraded,
            });
        }

        Ok(candidates)
    }

    /// Observed rate over the detection window as a fraction of the
    /// provider's configured limits. The tighter of the request and token
    /// limits wins; providers without limits report zero load.
    fn load_fraction(&self, entry: &RegisteredProvider) -> f64 {
        let window = self.config.rate_limit_window;
        let (requests, tokens) = self.health.current_load(&entry.provider.name, window);
        let scale = window.as_secs_f64() / 60.0;

        let mut fraction: f64 = 0.0;
        if let Some(rpm) = entry.provider.rpm_limit {
            let limit = (rpm as f64 * scale).max(1.0);
            fraction = fraction.max(requests as f64 / limit);
        }
        if let Some(tpm) = entry.provider.tpm_limit {
            let limit = (tpm as f64 * scale).max(1.0);
            fraction = fraction.max(tokens as f64 / limit);
        }
        fraction
    }

    fn attempt_timeout(&self, provider: &str) -> Duration {
        self.registry
            .get(provider)
            .and_then(|entry| entry.provider.timeout)
            .unwrap_or(self.config.attempt_timeout)
    }

    /// Route one request through the fallback chain.
    ///
    /// Attempts are strictly sequential; each attempt's outcome is recorded
    /// into the health tracker and cost accountant exactly once before the
    /// next attempt starts.
    pub async fn dispatch(&self, ctx: &RequestContext) -> Result<RoutedResponse, RouterError> {
        let candidates = self.build_candidates(ctx)?;
        let decision = self.engine.rank(self.strategy(), &candidates);

        debug!(
            request_id = %ctx.request_id,
            strategy = %decision.strategy,
            ranked = ?decision
                .ranked
                .iter()
                .map(|entry| (entry.provider.as_str(), entry.score))
                .collect::<Vec<_>>(),
            "routing decision"
        );

        let total = decision.ranked.len().min(self.config.max_fallback_attempts);
        let mut failures: Vec<AttemptFailure> = Vec::new();
        let started = Instant::now();

        for (position, ranked) in decision.ranked.iter().take(total).enumerate() {
            let Some(backend) = self.registry.backend(&ranked.provider) else {
                continue;
            };

            let attempt_start = Instant::now();
            let result = match tokio::time::timeout(
                self.attempt_timeout(&ranked.provider),
                backend.invoke(&ranked.native_model, ctx),
            )
            .await
            {
                Ok(result) => result,
                Err(_elapsed) => Err(BackendError::Timeout {
                    provider: ranked.provider.clone(),
                }),
            };
            let latency = attempt_start.elapsed();

            match result {
                Ok(response) => {
                    self.record_success(ctx, ranked, &response, latency);
                    info!(
                        request_id = %ctx.request_id,
                        provider = %ranked.provider,
                        model = %ranked.native_model,
                        attempts = position + 1,
                        "request served"
                    );
                    return Ok(RoutedResponse {
                        response,
                        provider: ranked.provider.clone(),
                        model: ranked.native_model.clone(),
                        attempts: (position + 1) as u32,
                        failed_attempts: failures,
                        latency: started.elapsed(),
                    });
                }
                Err(BackendError::BadRequest { provider, message }) => {
                    // The defect travels with the request; retrying against
                    // other providers would repeat it.
                    self.health.record_attempt(
                        &provider,
                        AttemptOutcome::Error {
                            kind: FailureKind::BadRequest,
                        },
                    );
                    self.record_failure(ctx, &provider, &ranked.native_model, latency);
                    warn!(
                        request_id = %ctx.request_id,
                        provider = %provider,
                        "bad request, aborting fallback chain"
                    );
                    return Err(RouterError::BadRequest { provider, message });
                }
                Err(err) => {
                    let kind = err.kind();
                    match &err {
                        BackendError::RateLimited { retry_after, .. } => {
                            self.health.record_attempt(
                                &ranked.provider,
                                AttemptOutcome::RateLimited {
                                    retry_after: *retry_after,
                                },
                            );
                        }
                        _ => {
                            self.health
                                .record_attempt(&ranked.provider, AttemptOutcome::Error { kind });
                        }
                    }
                    self.record_failure(ctx, &ranked.provider, &ranked.native_model, latency);

                    warn!(
                        request_id = %ctx.request_id,
                        provider = %ranked.provider,
                        %kind,
                        "attempt failed, falling back"
                    );
                    failures.push(AttemptFailure {
                        provider: ranked.provider.clone(),
                        model: ranked.native_model.clone(),
                        kind,
                        detail: err.to_string(),
                    });

                    // Rate limits get a breather before the next provider;
                    // other errors fall through immediately. The delay is
                    // pointless after the final candidate.
                    let is_last = position + 1 == total;
                    if kind == FailureKind::RateLimited
                        && !is_last
                        && !self.config.fallback_delay.is_zero()
                    {
                        tokio::time::sleep(self.config.fallback_delay).await;
                    }
                }
            }
        }

        Err(RouterError::AllProvidersExhausted { attempts: failures })
    }

    fn record_success(
        &self,
        ctx: &RequestContext,
        ranked: &ProviderScore,
        response: &BackendResponse,
        latency: Duration,
    ) {
        self.health.record_attempt(
            &ranked.provider,
            AttemptOutcome::Success {
                tokens: response.input_tokens + response.output_tokens,
                latency,
            },
        );
        let cost = self
            .costs
            .estimate_cost(
                &ranked.provider,
                &ranked.native_model,
                response.input_tokens,
                response.output_tokens,
            )
            .unwrap_or(Decimal::ZERO);
        self.costs.record_usage(UsageRecord {
            timestamp: Utc::now(),
            request_id: ctx.request_id,
            provider: ranked.provider.clone(),
            model: ranked.native_model.clone(),
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            cost,
            latency_ms: latency.as_millis() as u64,
            success: true,
        });
    }

    /// Failed attempts land in the usage log with zero tokens and zero cost,
    /// so totals only ever reflect completions.
    fn record_failure(&self, ctx: &RequestContext, provider: &str, model: &str, latency: Duration) {
        self.costs.record_usage(UsageRecord {
            timestamp: Utc::now(),
            request_id: ctx.request_id,
            provider: provider.to_string(),
            model: model.to_string(),
            input_tokens: 0,
            output_tokens: 0,
            cost: Decimal::ZERO,
            latency_ms: latency.as_millis() as u64,
            success: false,
        });
    }
}
