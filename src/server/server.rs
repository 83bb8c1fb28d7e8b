//! HTTP server wiring

use crate::config::Config;
use crate::error::Result;
use crate::server::routes;
use crate::server::state::AppState;
use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing::info;
use tracing_actix_web::TracingLogger;

/// Build the state from configuration and run the server until shutdown.
pub async fn run(config: Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    run_with_state(state).await
}

/// Run the server with pre-built state.
pub async fn run_with_state(state: AppState) -> Result<()> {
    let host = state.config.server.host.clone();
    let port = state.config.server.port;

    info!("server starting at http://{host}:{port}");
    info!("endpoints:");
    info!("   POST /v1/messages - chat messages");
    info!("   GET  /v1/models - model list");
    info!("   GET  /health - gateway and provider health");
    info!("   GET  /stats - request and cost statistics");
    info!("   POST /admin/routing-strategy - switch routing strategy");
    info!("   GET  /admin/providers/{{provider}}/health - provider detail");

    let data = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .configure(routes::configure)
    })
    .bind((host, port))?
    .run()
    .await?;

    Ok(())
}
