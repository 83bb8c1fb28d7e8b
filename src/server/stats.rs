//! Rolling gateway request counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Lock-free counters shared across all request handlers
#[derive(Debug, Default)]
pub struct GatewayStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    fallback_requests: AtomicU64,
    rate_limited_attempts: AtomicU64,
    active_requests: AtomicUsize,
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub fallback_requests: u64,
    pub rate_limited_attempts: u64,
    pub active_requests: usize,
}

impl GatewayStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a request if the in-flight cap allows it. The returned guard
    /// decrements the gauge when dropped, including on client disconnect.
    pub fn try_acquire(stats: &Arc<GatewayStats>, max_concurrent: usize) -> Option<InflightGuard> {
        let previous = stats.active_requests.fetch_add(1, Ordering::Relaxed);
        if previous >= max_concurrent {
            stats.active_requests.fetch_sub(1, Ordering::Relaxed);
            return None;
        }
        stats.total_requests.fetch_add(1, Ordering::Relaxed);
        Some(InflightGuard {
            stats: Arc::clone(stats),
        })
    }

    pub fn record_success(&self, used_fallback: bool, rate_limited_attempts: usize) {
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
        if used_fallback {
            self.fallback_requests.fetch_add(1, Ordering::Relaxed);
        }
        self.rate_limited_attempts
            .fetch_add(rate_limited_attempts as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self, rate_limited_attempts: usize) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
        self.rate_limited_attempts
            .fetch_add(rate_limited_attempts as u64, Ordering::Relaxed);
    }

    pub fn active_requests(&self) -> usize {
        self.active_requests.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> GatewayStatsSnapshot {
        GatewayStatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            fallback_requests: self.fallback_requests.load(Ordering::Relaxed),
            rate_limited_attempts: self.rate_limited_attempts.load(Ordering::Relaxed),
            active_requests: self.active_requests.load(Ordering::Relaxed),
        }
    }
}

/// RAII guard for the in-flight request gauge
pub struct InflightGuard {
    stats: Arc<GatewayStats>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.stats.active_requests.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_cap() {
        let stats = Arc::new(GatewayStats::new());

        let first = GatewayStats::try_acquire(&stats, 2);
        let second = GatewayStats::try_acquire(&stats, 2);
        assert!(first.is_some());
        assert!(second.is_some());
        assert!(GatewayStats::try_acquire(&stats, 2).is_none());

        drop(first);
        assert!(GatewayStats::try_acquire(&stats, 2).is_some());
    }

    #[test]
    fn test_guard_decrements_on_drop() {
        let stats = Arc::new(GatewayStats::new());
        {
            let _guard = GatewayStats::try_acquire(&stats, 10).unwrap();
            assert_eq!(stats.active_requests(), 1);
        }
        assert_eq!(stats.active_requests(), 0);
    }

    #[test]
    fn test_counters() {
        let stats = Arc::new(GatewayStats::new());
        let _guard = GatewayStats::try_acquire(&stats, 10).unwrap();

        stats.record_success(true, 2);
        stats.record_failure(1);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_requests, 1);
        assert_eq!(snapshot.successful_requests, 1);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.fallback_requests, 1);
        assert_eq!(snapshot.rate_limited_attempts, 3);
    }
}
