//! Route registration and shared handler helpers

pub mod admin;
pub mod health;
pub mod messages;
pub mod models;

use crate::core::router::RouterError;
use crate::server::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

/// Register all gateway routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/v1/messages", web::post().to(messages::create_message))
        .route("/v1/models", web::get().to(models::list_models))
        .route("/health", web::get().to(health::health_check))
        .route("/stats", web::get().to(admin::stats))
        .route(
            "/admin/routing-strategy",
            web::post().to(admin::update_routing_strategy),
        )
        .route(
            "/admin/providers/{provider}/health",
            web::get().to(admin::provider_health),
        );
}

/// Standard error body shape.
pub(crate) fn error_body(kind: &str, message: impl Into<String>) -> serde_json::Value {
    json!({
        "type": "error",
        "error": {
            "type": kind,
            "message": message.into(),
        }
    })
}

/// Map a terminal routing failure onto the external status semantics.
///
/// Every terminal failure body carries enough detail to distinguish
/// "everything is down" from "this model doesn't exist anywhere" from
/// "your request was malformed".
pub(crate) fn router_error_response(err: RouterError) -> HttpResponse {
    match err {
        RouterError::BadRequest { provider, message } => {
            HttpResponse::BadRequest().json(json!({
                "type": "error",
                "error": {
                    "type": "invalid_request_error",
                    "message": message,
                    "provider": provider,
                }
            }))
        }
        RouterError::NoEligibleProvider { model, reason } => {
            let body = json!({
                "type": "error",
                "error": {
                    "type": "no_eligible_provider",
                    "message": format!("no eligible provider for model '{model}': {reason}"),
                    "model": model,
                    "reason": reason,
                }
            });
            match reason {
                crate::core::router::NoEligibleReason::UnmappedModel => {
                    HttpResponse::NotFound().json(body)
                }
                crate::core::router::NoEligibleReason::AllProvidersDegraded => {
                    HttpResponse::ServiceUnavailable().json(body)
                }
            }
        }
        RouterError::AllProvidersExhausted { attempts } => {
            HttpResponse::ServiceUnavailable().json(json!({
                "type": "error",
                "error": {
                    "type": "all_providers_exhausted",
                    "message": "every ranked provider failed for this request",
                    "attempts": attempts,
                }
            }))
        }
    }
}

/// Optional static bearer-token check.
///
/// Returns the rejection response when an API key is configured and the
/// request does not carry it.
pub(crate) fn authorize(state: &AppState, req: &HttpRequest) -> Option<HttpResponse> {
    let expected = state.config.server.api_key.as_deref()?;

    let presented = req
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if presented == Some(expected) {
        None
    } else {
        Some(HttpResponse::Unauthorized().json(error_body(
            "authentication_error",
            "invalid or missing API key",
        )))
    }
}
