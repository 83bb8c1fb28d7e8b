//! Gateway-level error type

use thiserror::Error;

/// Result type alias for gateway setup and configuration paths
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors raised outside the routing hot path: configuration loading,
/// validation, and server startup. Routing failures use
/// [`crate::core::router::RouterError`] and are mapped to HTTP responses by
/// the route handlers.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
