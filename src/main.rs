//! modelmux gateway binary

use clap::Parser;
use modelmux::config::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gateway", about = "Intelligent multi-provider LLM routing gateway")]
struct Args {
    /// Path to the gateway configuration file
    #[arg(short, long, default_value = "config/gateway.yaml")]
    config: PathBuf,

    /// Override the listen host
    #[arg(long, env = "GATEWAY_HOST")]
    host: Option<String>,

    /// Override the listen port
    #[arg(long, env = "GATEWAY_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut config = match Config::from_file(&args.config) {
        Ok(config) => {
            info!(path = %args.config.display(), "configuration loaded");
            config
        }
        Err(err) => {
            warn!(
                path = %args.config.display(),
                "configuration file unavailable ({err}), using defaults"
            );
            Config::default()
        }
    };

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if config.providers.is_empty() {
        warn!("no providers configured; every request will fail with no_eligible_provider");
    }

    match modelmux::server::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
