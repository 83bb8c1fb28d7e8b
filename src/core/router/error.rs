//! Router error types

use crate::core::providers::FailureKind;
use serde::Serialize;

/// One failed provider attempt within a request's fallback chain
#[derive(Debug, Clone, Serialize)]
pub struct AttemptFailure {
    /// Provider that was attempted
    pub provider: String,
    /// Native model the request was mapped to
    pub model: String,
    /// Failure classification
    pub kind: FailureKind,
    /// Human-readable detail from the backend
    pub detail: String,
}

/// Why no provider was eligible for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoEligibleReason {
    /// The requested alias is unmapped on every configured provider
    UnmappedModel,
    /// Every provider that maps the alias is currently excluded by its
    /// circuit breaker
    AllProvidersDegraded,
}

impl std::fmt::Display for NoEligibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoEligibleReason::UnmappedModel => {
                write!(f, "model is not mapped on any configured provider")
            }
            NoEligibleReason::AllProvidersDegraded => {
                write!(f, "all mapping providers are degraded")
            }
        }
    }
}

/// Terminal routing failures surfaced to the gateway
#[derive(Debug, Clone, thiserror::Error)]
pub enum RouterError {
    /// The request itself was rejected; other providers would reject it too,
    /// so no fallback is attempted.
    #[error("request rejected by {provider}: {message}")]
    BadRequest { provider: String, message: String },

    /// No configured provider could serve the requested model right now.
    #[error("no eligible provider for model '{model}': {reason}")]
    NoEligibleProvider {
        model: String,
        reason: NoEligibleReason,
    },

    /// Every ranked candidate was attempted and failed.
    #[error("all providers exhausted: {}", describe_attempts(attempts))]
    AllProvidersExhausted { attempts: Vec<AttemptFailure> },
}

fn describe_attempts(attempts: &[AttemptFailure]) -> String {
    attempts
        .iter()
        .map(|attempt| format!("{} ({})", attempt.provider, attempt.kind))
        .collect::<Vec<_>>()
        .join(", ")
}
