//! # modelmux
//!
//! An intelligent multi-provider LLM routing gateway. Accepts chat messages
//! requests, scores the configured providers on rate-limit headroom, latency,
//! cost, and reliability, forwards the request through an ordered fallback
//! chain, and tracks cost and health as it goes.
//!
//! ## Features
//!
//! - **Intelligent routing**: composite scoring with selectable strategies
//!   (`intelligent`, `cost`, `performance`, `availability`)
//! - **Rate-limit avoidance**: providers approaching their configured limits
//!   are deprioritized before they start returning 429s
//! - **Automatic fallback**: rate limits, timeouts, and server errors fall
//!   through the ranked chain; terminal failures report every attempt
//! - **Circuit breaking**: repeatedly failing providers cool down, then
//!   recover through a single probation attempt
//! - **Cost accounting**: decimal-exact per-request costs, running totals,
//!   and budget alert thresholds
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use modelmux::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file("config/gateway.yaml")?;
//!     modelmux::server::run(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod server;

pub use config::Config;
pub use core::router::{FallbackRouter, RouterError};
pub use core::scoring::RoutingStrategy;
pub use error::{GatewayError, Result};
pub use server::AppState;
