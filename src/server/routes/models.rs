//! Model listing endpoint

use crate::server::state::AppState;
use actix_web::{web, HttpResponse, Result as ActixResult};
use serde_json::json;

/// List every model alias served by the configured providers.
pub async fn list_models(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let data: Vec<serde_json::Value> = state
        .registry
        .iter()
        .flat_map(|entry| {
            let provider = entry.provider.name.clone();
            entry
                .provider
                .model_map
                .iter()
                .map(move |(alias, native)| {
                    json!({
                        "id": alias,
                        "provider": provider,
                        "model": native,
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "object": "list",
        "data": data,
    })))
}
