//! Fallback router
//!
//! Orchestrates each request: ranks eligible providers through the scoring
//! engine, attempts delivery through the provider backend abstraction in
//! ranked order with bounded fallback, and records every outcome into the
//! health tracker and cost accountant.

pub mod config;
pub mod error;
pub mod router;


pub use config::RouterConfig;
pub use error::{AttemptFailure, NoEligibleReason, RouterError};
pub use router::{FallbackRouter, RoutedResponse};
