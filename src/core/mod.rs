//! Core routing components
//!
//! Everything the gateway needs to pick, call, and account for a provider:
//!
//! - `types` - wire formats and the normalized request context
//! - `providers` - the provider backend trait, registry, and HTTP backend
//! - `health` - per-provider rolling health and the circuit breaker
//! - `cost` - price tables, the usage log, and budget thresholds
//! - `scoring` - strategy-based provider ranking
//! - `router` - the fallback execution loop

pub mod cost;
pub mod health;
pub mod providers;
pub mod router;
pub mod scoring;
pub mod types;
