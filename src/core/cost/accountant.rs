//! Usage log and running cost totals

use super::pricing::PricingTable;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

/// One entry per completed request attempt
#[derive(Debug, Clone, Serialize)]
pub struct UsageRecord {
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
    pub provider: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: Decimal,
    pub latency_ms: u64,
    pub success: bool,
}

/// Aggregation period for totals and alert thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostPeriod {
    Hourly,
    Daily,
}

impl CostPeriod {
    fn span(self) -> chrono::Duration {
        match self {
            CostPeriod::Hourly => chrono::Duration::hours(1),
            CostPeriod::Daily => chrono::Duration::days(1),
        }
    }
}

/// Alert thresholds in USD; `None` disables the check
#[derive(Debug, Clone, Default)]
pub struct CostAlerts {
    pub hourly_threshold: Option<Decimal>,
    pub daily_threshold: Option<Decimal>,
}

/// Per-provider usage aggregate for the stats surface
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderUsageStats {
    pub requests: u64,
    pub successes: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_cost: Decimal,
    pub avg_latency_ms: f64,
}

#[derive(Debug, Default)]
struct ProviderAccum {
    requests: u64,
    successes: u64,
    input_tokens: u64,
    output_tokens: u64,
    total_cost: Decimal,
    total_latency_ms: u64,
}

/// Cost accountant: price estimation, append-only usage log, running totals
///
/// The accountant only signals budget breaches; it never blocks requests.
pub struct CostAccountant {
    pricing: PricingTable,
    alerts: CostAlerts,
    log: RwLock<Vec<UsageRecord>>,
    by_provider: DashMap<String, ProviderAccum>,
}

impl CostAccountant {
    pub fn new(pricing: PricingTable, alerts: CostAlerts) -> Self {
        Self {
            pricing,
            alerts,
            log: RwLock::new(Vec::new()),
            by_provider: DashMap::new(),
        }
    }

    /// Cost of a request in USD, or `None` when the provider+model pair has
    /// no price entry.
    pub fn estimate_cost(
        &self,
        provider: &str,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
    ) -> Option<Decimal> {
        self.pricing
            .estimate(provider, model, input_tokens, output_tokens)
    }

    /// Append a usage record and update running aggregates.
    pub fn record_usage(&self, record: UsageRecord) {
        {
            let mut accum = self.by_provider.entry(record.provider.clone()).or_default();
            accum.requests += 1;
            if record.success {
                accum.successes += 1;
            }
            accum.input_tokens += record.input_tokens;
            accum.output_tokens += record.output_tokens;
            accum.total_cost += record.cost;
            accum.total_latency_ms += record.latency_ms;
        }

        self.log.write().push(record);
        self.check_alerts();
    }

    fn check_alerts(&self) {
        for (period, threshold) in [
            (CostPeriod::Hourly, self.alerts.hourly_threshold),
            (CostPeriod::Daily, self.alerts.daily_threshold),
        ] {
            if threshold.is_some() {
                let (breached, total) = self.over_threshold(period);
                if breached {
                    warn!(
                        ?period,
                        %total,
                        threshold = %threshold.unwrap_or_default(),
                        "cost threshold exceeded"
                    );
                }
            }
        }
    }

    /// Total recorded cost within the trailing period.
    pub fn total_for_period(&self, period: CostPeriod) -> Decimal {
        let cutoff = Utc::now() - period.span();
        self.log
            .read()
            .iter()
            .rev()
            .take_while(|record| record.timestamp >= cutoff)
            .map(|record| record.cost)
            .sum()
    }

    /// Compare the running total for `period` against the configured alert
    /// threshold. Returns `(breached, current_total)`; an unconfigured
    /// threshold never breaches.
    pub fn over_threshold(&self, period: CostPeriod) -> (bool, Decimal) {
        let total = self.total_for_period(period);
        let threshold = match period {
            CostPeriod::Hourly => self.alerts.hourly_threshold,
            CostPeriod::Daily => self.alerts.daily_threshold,
        };
        match threshold {
            Some(limit) => (total > limit, total),
            None => (false, total),
        }
    }

    /// Lifetime cost across all providers.
    pub fn total_cost(&self) -> Decimal {
        self.by_provider
            .iter()
            .map(|entry| entry.value().total_cost)
            .sum()
    }

    /// Per-provider aggregates, sorted by provider name for stable output.
    pub fn provider_stats(&self) -> Vec<(String, ProviderUsageStats)> {
        let mut stats: Vec<_> = self
            .by_provider
            .iter()
            .map(|entry| {
                let accum = entry.value();
                let avg_latency_ms = if accum.requests > 0 {
                    accum.total_latency_ms as f64 / accum.requests as f64
                } else {
                    0.0
                };
                (
                    entry.key().clone(),
                    ProviderUsageStats {
                        requests: accum.requests,
                        successes: accum.successes,
                        input_tokens: accum.input_tokens,
                        output_tokens: accum.output_tokens,
                        total_cost: accum.total_cost,
                        avg_latency_ms,
                    },
                )
            })
            .collect();
        stats.sort_by(|a, b| a.0.cmp(&b.0));
        stats
    }

    /// Number of records in the usage log.
    pub fn record_count(&self) -> usize {
        self.log.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cost::pricing::PricingEntry;
    use rust_decimal_macros::dec;

    fn accountant(hourly: Option<Decimal>) -> CostAccountant {
        let mut pricing = PricingTable::new();
        pricing.insert(
            "vertex",
            "sonnet-native",
            PricingEntry {
                input_price_per_million: dec!(3.0),
                output_price_per_million: dec!(15.0),
            },
        );
        CostAccountant::new(
            pricing,
            CostAlerts {
                hourly_threshold: hourly,
                daily_threshold: None,
            },
        )
    }

    fn record(cost: Decimal) -> UsageRecord {
        UsageRecord {
            timestamp: Utc::now(),
            request_id: Uuid::new_v4(),
            provider: "vertex".to_string(),
            model: "sonnet-native".to_string(),
            input_tokens: 100,
            output_tokens: 50,
            cost,
            latency_ms: 250,
            success: true,
        }
    }

    #[test]
    fn test_single_record_round_trip() {
        let accountant = accountant(None);
        let cost = accountant
            .estimate_cost("vertex", "sonnet-native", 100, 50)
            .unwrap();

        accountant.record_usage(record(cost));

        assert_eq!(accountant.total_for_period(CostPeriod::Hourly), cost);
        assert_eq!(accountant.total_cost(), cost);
        assert_eq!(accountant.record_count(), 1);
    }

    #[test]
    fn test_unknown_pricing_is_sentinel_not_zero() {
        let accountant = accountant(None);
        assert!(accountant
            .estimate_cost("vertex", "other-model", 100, 50)
            .is_none());
    }

    #[test]
    fn test_totals_accumulate_exactly() {
        let accountant = accountant(None);
        accountant.record_usage(record(dec!(0.1)));
        accountant.record_usage(record(dec!(0.2)));
        accountant.record_usage(record(dec!(0.3)));

        assert_eq!(accountant.total_cost(), dec!(0.6));
    }

    #[test]
    fn test_over_threshold_signal() {
        let accountant = accountant(Some(dec!(0.5)));

        accountant.record_usage(record(dec!(0.3)));
        let (breached, total) = accountant.over_threshold(CostPeriod::Hourly);
        assert!(!breached);
        assert_eq!(total, dec!(0.3));

        accountant.record_usage(record(dec!(0.4)));
        let (breached, total) = accountant.over_threshold(CostPeriod::Hourly);
        assert!(breached);
        assert_eq!(total, dec!(0.7));
    }

    #[test]
    fn test_unconfigured_threshold_never_breaches() {
        let accountant = accountant(None);
        accountant.record_usage(record(dec!(100.0)));
        let (breached, _) = accountant.over_threshold(CostPeriod::Daily);
        assert!(!breached);
    }

    #[test]
    fn test_provider_stats_aggregate() {
        let accountant = accountant(None);
        accountant.record_usage(record(dec!(0.1)));
        let mut failed = record(dec!(0.0));
        failed.success = false;
        failed.input_tokens = 0;
        failed.output_tokens = 0;
        accountant.record_usage(failed);

        let stats = accountant.provider_stats();
        assert_eq!(stats.len(), 1);
        let (name, vertex) = &stats[0];
        assert_eq!(name, "vertex");
        assert_eq!(vertex.requests, 2);
        assert_eq!(vertex.successes, 1);
        assert_eq!(vertex.total_cost, dec!(0.1));
    }
}
