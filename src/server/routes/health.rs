//! Health endpoint

use crate::server::state::AppState;
use actix_web::{web, HttpResponse, Result as ActixResult};
use serde_json::json;

/// Gateway status plus a health snapshot for every configured provider.
pub async fn health_check(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let providers: serde_json::Map<String, serde_json::Value> = state
        .registry
        .iter()
        .map(|entry| {
            let snapshot = state.health.snapshot(&entry.provider.name);
            (
                entry.provider.name.clone(),
                serde_json::to_value(snapshot).unwrap_or_default(),
            )
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "active_requests": state.stats.active_requests(),
        "providers": providers,
        "stats": state.stats.snapshot(),
    })))
}
