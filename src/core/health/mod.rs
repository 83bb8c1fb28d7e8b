//! Provider health tracking
//!
//! Maintains rolling per-provider usage and failure state to support
//! rate-limit avoidance and reliability scoring, including the circuit
//! breaker that takes repeatedly failing providers out of rotation.

pub mod tracker;
pub mod types;

pub use tracker::{HealthTracker, HealthTrackerConfig};
pub use types::{AttemptOutcome, CircuitState, HealthSnapshot};
