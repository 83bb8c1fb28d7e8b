//! Provider backend abstraction
//!
//! All concrete providers sit behind the [`ProviderBackend`] trait and are
//! resolved through the [`ProviderRegistry`] at startup. Adding a provider
//! means registering a new implementation, never adding a branch.

pub mod http;
pub mod registry;
#[cfg(test)]
pub mod testing;

pub use http::HttpBackend;
pub use registry::{Provider, ProviderRegistry, RegisteredProvider};

use crate::core::types::{RequestContext, StopReason};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Classification of a failed backend attempt
///
/// `RateLimited`, `Timeout`, and `ServerError` are recoverable via fallback;
/// `BadRequest` is not, because the defect travels with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RateLimited,
    Timeout,
    ServerError,
    BadRequest,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::RateLimited => write!(f, "rate_limited"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::ServerError => write!(f, "server_error"),
            FailureKind::BadRequest => write!(f, "bad_request"),
        }
    }
}

/// Error returned by a provider backend
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// Provider signaled throttling (HTTP 429 or equivalent)
    #[error("rate limited by {provider}")]
    RateLimited {
        provider: String,
        /// Seconds until the provider expects capacity, when advertised
        retry_after: Option<u64>,
    },

    /// No response within the attempt timeout
    #[error("timeout waiting for {provider}")]
    Timeout { provider: String },

    /// Backend 5xx or malformed response
    #[error("server error from {provider}: {message}")]
    ServerError { provider: String, message: String },

    /// The outgoing request itself was rejected; retrying elsewhere would repeat it
    #[error("bad request rejected by {provider}: {message}")]
    BadRequest { provider: String, message: String },
}

impl BackendError {
    /// The failure classification used in attempt histories and health records.
    pub fn kind(&self) -> FailureKind {
        match self {
            BackendError::RateLimited { .. } => FailureKind::RateLimited,
            BackendError::Timeout { .. } => FailureKind::Timeout,
            BackendError::ServerError { .. } => FailureKind::ServerError,
            BackendError::BadRequest { .. } => FailureKind::BadRequest,
        }
    }

    /// Provider that produced the error.
    pub fn provider(&self) -> &str {
        match self {
            BackendError::RateLimited { provider, .. }
            | BackendError::Timeout { provider }
            | BackendError::ServerError { provider, .. }
            | BackendError::BadRequest { provider, .. } => provider,
        }
    }
}

/// Successful completion returned by a provider backend
#[derive(Debug, Clone)]
pub struct BackendResponse {
    /// Generated text
    pub text: String,
    /// Prompt tokens consumed
    pub input_tokens: u64,
    /// Completion tokens generated
    pub output_tokens: u64,
    /// Normalized stop reason
    pub stop_reason: StopReason,
}

/// Capability interface every provider backend implements
///
/// Implementations perform the actual network call. The router measures
/// latency and applies the per-attempt timeout around `invoke`.
#[async_trait]
pub trait ProviderBackend: Send + Sync {
    /// Execute one completion attempt against the provider.
    async fn invoke(
        &self,
        native_model: &str,
        ctx: &RequestContext,
    ) -> Result<BackendResponse, BackendError>;
}
