//! Cost accounting
//!
//! Computes per-request cost from token counts and provider price tables and
//! aggregates running totals for budget-threshold checks. All monetary
//! arithmetic uses `Decimal`; long-running totals must not drift the way
//! accumulated binary floats do.

pub mod accountant;
pub mod pricing;

pub use accountant::{CostAccountant, CostAlerts, CostPeriod, ProviderUsageStats, UsageRecord};
pub use pricing::{PricingEntry, PricingTable};
