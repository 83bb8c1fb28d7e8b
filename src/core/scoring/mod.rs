//! Provider scoring and ranking
//!
//! Combines health, cost, and latency signals into a per-provider score under
//! the selected strategy and produces a total order over the candidates.
//! Candidates arrive in provider registration order and every sort is stable,
//! so identical inputs always rank identically.

use crate::core::health::HealthSnapshot;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Selectable routing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingStrategy {
    /// Weighted composite of rate-limit headroom, latency, cost, reliability
    #[default]
    Intelligent,
    /// Cheapest first
    Cost,
    /// Lowest average latency first
    Performance,
    /// Highest reliability first
    Availability,
}

impl FromStr for RoutingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "intelligent" => Ok(Self::Intelligent),
            "cost" => Ok(Self::Cost),
            "performance" => Ok(Self::Performance),
            "availability" => Ok(Self::Availability),
            _ => Err(format!(
                "invalid routing strategy '{s}', expected: intelligent, cost, performance, availability"
            )),
        }
    }
}

impl std::fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingStrategy::Intelligent => write!(f, "intelligent"),
            RoutingStrategy::Cost => write!(f, "cost"),
            RoutingStrategy::Performance => write!(f, "performance"),
            RoutingStrategy::Availability => write!(f, "availability"),
        }
    }
}

/// A provider eligible for this request, with its decision-time signals
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Provider name
    pub provider: String,
    /// Native model the provider maps the requested alias to
    pub native_model: String,
    /// Health snapshot at decision time
    pub health: HealthSnapshot,
    /// Observed rate / configured limit over the detection window; 0.0 when
    /// the provider has no configured limits
    pub load_fraction: f64,
    /// Estimated cost of this request; `None` when pricing is unknown
    pub estimated_cost: Option<Decimal>,
}

/// One ranked entry of a routing decision
#[derive(Debug, Clone, Serialize)]
pub struct ProviderScore {
    pub provider: String,
    pub native_model: String,
    pub score: f64,
}

/// Ephemeral per-request ranking
#[derive(Debug, Clone, Serialize)]
pub struct RoutingDecision {
    pub strategy: RoutingStrategy,
    pub ranked: Vec<ProviderScore>,
}

const RATE_LIMIT_WEIGHT: f64 = 0.4;
const PERFORMANCE_WEIGHT: f64 = 0.3;
const COST_WEIGHT: f64 = 0.2;
const RELIABILITY_WEIGHT: f64 = 0.1;

/// Neutral cost-efficiency for providers without pricing data
const UNKNOWN_COST_EFFICIENCY: f64 = 0.5;

/// Ranks eligible candidates under a strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// Produce a total order over `candidates`, highest-ranked first.
    ///
    /// All ties fall through to the candidates' original (registration)
    /// order via stable sort.
    pub fn rank(&self, strategy: RoutingStrategy, candidates: &[Candidate]) -> RoutingDecision {
        let mut ordered: Vec<&Candidate> = candidates.iter().collect();

        match strategy {
            RoutingStrategy::Intelligent => {
                ordered.sort_by(|a, b| {
                    composite_score(b).total_cmp(&composite_score(a))
                });
            }
            RoutingStrategy::Cost => {
                ordered.sort_by(|a, b| {
                    cost_key(a)
                        .cmp(&cost_key(b))
                        .then_with(|| b.health.reliability.total_cmp(&a.health.reliability))
                });
            }
            RoutingStrategy::Performance => {
                ordered.sort_by(|a, b| {
                    a.health
                        .avg_latency_ms
                        .total_cmp(&b.health.avg_latency_ms)
                        .then_with(|| b.health.reliability.total_cmp(&a.health.reliability))
                });
            }
            RoutingStrategy::Availability => {
                ordered.sort_by(|a, b| {
                    b.health
                        .reliability
                        .total_cmp(&a.health.reliability)
                        .then_with(|| {
                            rate_limit_avoidance(b).total_cmp(&rate_limit_avoidance(a))
                        })
                });
            }
        }

        let ranked = ordered
            .into_iter()
            .map(|candidate| ProviderScore {
                provider: candidate.provider.clone(),
                native_model: candidate.native_model.clone(),
                score: strategy_score(strategy, candidate),
            })
            .collect();

        RoutingDecision { strategy, ranked }
    }
}

/// Sort key for the cost strategy: unknown cost ranks after any known cost.
fn cost_key(candidate: &Candidate) -> Decimal {
    candidate.estimated_cost.unwrap_or(Decimal::MAX)
}

fn rate_limit_avoidance(candidate: &Candidate) -> f64 {
    1.0 - candidate.load_fraction.clamp(0.0, 1.0)
}

fn performance_score(candidate: &Candidate) -> f64 {
    // Latency normalized to seconds.
    1.0 / (1.0 + candidate.health.avg_latency_ms / 1000.0)
}

fn cost_efficiency(candidate: &Candidate) -> f64 {
    match candidate.estimated_cost {
        Some(cost) => 1.0 / (1.0 + cost.to_f64().unwrap_or(0.0).max(0.0)),
        None => UNKNOWN_COST_EFFICIENCY,
    }
}

fn composite_score(candidate: &Candidate) -> f64 {
    RATE_LIMIT_WEIGHT * rate_limit_avoidance(candidate)
        + PERFORMANCE_WEIGHT * performance_score(candidate)
        + COST_WEIGHT * cost_efficiency(candidate)
        + RELIABILITY_WEIGHT * candidate.health.reliability
}

/// The reported score for a ranked entry: the strategy's primary metric,
/// normalized so higher is always better.
fn strategy_score(strategy: RoutingStrategy, candidate: &Candidate) -> f64 {
    match strategy {
        RoutingStrategy::Intelligent => composite_score(candidate),
        RoutingStrategy::Cost => match candidate.estimated_cost {
            Some(cost) => 1.0 / (1.0 + cost.to_f64().unwrap_or(0.0).max(0.0)),
            None => 0.0,
        },
        RoutingStrategy::Performance => performance_score(candidate),
        RoutingStrategy::Availability => candidate.health.reliability,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::health::HealthSnapshot;
    use rust_decimal_macros::dec;

    fn candidate(provider: &str, cost: Option<Decimal>) -> Candidate {
        Candidate {
            provider: provider.to_string(),
            native_model: format!("{provider}-sonnet"),
            health: HealthSnapshot::default(),
            load_fraction: 0.0,
            estimated_cost: cost,
        }
    }

    fn names(decision: &RoutingDecision) -> Vec<&str> {
        decision
            .ranked
            .iter()
            .map(|entry| entry.provider.as_str())
            .collect()
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let engine = ScoringEngine::new();
        let candidates = vec![
            candidate("a", Some(dec!(1.0))),
            candidate("b", Some(dec!(0.5))),
            candidate("c", None),
        ];

        for strategy in [
            RoutingStrategy::Intelligent,
            RoutingStrategy::Cost,
            RoutingStrategy::Performance,
            RoutingStrategy::Availability,
        ] {
            let first = engine.rank(strategy, &candidates);
            let second = engine.rank(strategy, &candidates);
            assert_eq!(names(&first), names(&second), "strategy {strategy}");
        }
    }

    #[test]
    fn test_ties_fall_back_to_registration_order() {
        let engine = ScoringEngine::new();
        let candidates = vec![
            candidate("first", Some(dec!(1.0))),
            candidate("second", Some(dec!(1.0))),
            candidate("third", Some(dec!(1.0))),
        ];

        for strategy in [
            RoutingStrategy::Intelligent,
            RoutingStrategy::Cost,
            RoutingStrategy::Performance,
            RoutingStrategy::Availability,
        ] {
            let decision = engine.rank(strategy, &candidates);
            assert_eq!(names(&decision), vec!["first", "second", "third"]);
        }
    }

    #[test]
    fn test_cost_strategy_prefers_cheaper() {
        let engine = ScoringEngine::new();
        let candidates = vec![
            candidate("a", Some(dec!(1.0))),
            candidate("b", Some(dec!(0.5))),
        ];

        let decision = engine.rank(RoutingStrategy::Cost, &candidates);
        assert_eq!(names(&decision), vec!["b", "a"]);
    }

    #[test]
    fn test_cost_strategy_ranks_unknown_after_known() {
        let engine = ScoringEngine::new();
        let candidates = vec![
            candidate("unknown", None),
            candidate("expensive", Some(dec!(50.0))),
        ];

        let decision = engine.rank(RoutingStrategy::Cost, &candidates);
        assert_eq!(names(&decision), vec!["expensive", "unknown"]);
    }

    #[test]
    fn test_intelligent_prefers_cheaper_when_otherwise_equal() {
        let engine = ScoringEngine::new();
        let candidates = vec![
            candidate("a", Some(dec!(1.0))),
            candidate("b", Some(dec!(0.5))),
        ];

        let decision = engine.rank(RoutingStrategy::Intelligent, &candidates);
        assert_eq!(names(&decision), vec!["b", "a"]);
    }

    #[test]
    fn test_intelligent_unknown_cost_gets_neutral_value() {
        let unknown = candidate("u", None);
        assert_eq!(cost_efficiency(&unknown), 0.5);

        // Neutral beats expensive, loses to cheap.
        let cheap = candidate("c", Some(dec!(0.1)));
        let expensive = candidate("e", Some(dec!(9.0)));
        assert!(cost_efficiency(&cheap) > cost_efficiency(&unknown));
        assert!(cost_efficiency(&unknown) > cost_efficiency(&expensive));
    }

    #[test]
    fn test_provider_at_limit_scores_zero_headroom_not_excluded() {
        let engine = ScoringEngine::new();
        let mut saturated = candidate("saturated", Some(dec!(0.5)));
        saturated.load_fraction = 1.3;
        let fresh = candidate("fresh", Some(dec!(0.5)));

        assert_eq!(rate_limit_avoidance(&saturated), 0.0);

        let decision = engine.rank(RoutingStrategy::Intelligent, &[saturated, fresh]);
        // Deprioritized, not dropped.
        assert_eq!(names(&decision), vec!["fresh", "saturated"]);
        assert_eq!(decision.ranked.len(), 2);
    }

    #[test]
    fn test_performance_strategy_prefers_lower_latency() {
        let engine = ScoringEngine::new();
        let mut slow = candidate("slow", None);
        slow.health.avg_latency_ms = 2000.0;
        let mut fast = candidate("fast", None);
        fast.health.avg_latency_ms = 150.0;

        let decision = engine.rank(RoutingStrategy::Performance, &[slow, fast]);
        assert_eq!(names(&decision), vec!["fast", "slow"]);
    }

    #[test]
    fn test_availability_strategy_prefers_reliability() {
        let engine = ScoringEngine::new();
        let mut flaky = candidate("flaky", None);
        flaky.health.reliability = 0.6;
        let mut solid = candidate("solid", None);
        solid.health.reliability = 0.99;

        let decision = engine.rank(RoutingStrategy::Availability, &[flaky, solid]);
        assert_eq!(names(&decision), vec!["solid", "flaky"]);
    }

    #[test]
    fn test_strategy_parse_round_trip() {
        for strategy in [
            RoutingStrategy::Intelligent,
            RoutingStrategy::Cost,
            RoutingStrategy::Performance,
            RoutingStrategy::Availability,
        ] {
            assert_eq!(strategy.to_string().parse::<RoutingStrategy>(), Ok(strategy));
        }
        assert!("fastest".parse::<RoutingStrategy>().is_err());
    }
}
