//! Messages endpoint
//!
//! Validates and normalizes the external request, routes it through the
//! fallback chain under an overall deadline, and translates the result back
//! into the wire format.

use super::{authorize, error_body, router_error_response};
use crate::core::providers::FailureKind;
use crate::core::router::RouterError;
use crate::core::types::{MessagesRequest, MessagesResponse, RequestContext};
use crate::server::state::AppState;
use crate::server::stats::GatewayStats;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use std::time::Duration;
use tracing::{info, warn};

/// Extra headroom on top of the router's worst-case budget before the
/// gateway gives up on a request.
const DEADLINE_MARGIN: Duration = Duration::from_secs(5);

pub async fn create_message(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<MessagesRequest>,
) -> ActixResult<HttpResponse> {
    if let Some(rejection) = authorize(&state, &req) {
        return Ok(rejection);
    }

    let Some(_guard) =
        GatewayStats::try_acquire(&state.stats, state.config.server.max_concurrent_requests)
    else {
        return Ok(HttpResponse::TooManyRequests().json(error_body(
            "overloaded_error",
            "too many concurrent requests",
        )));
    };

    let request = body.into_inner();
    if request.model.is_empty() {
        return Ok(HttpResponse::BadRequest()
            .json(error_body("invalid_request_error", "model is required")));
    }
    if request.messages.is_empty() {
        return Ok(HttpResponse::BadRequest().json(error_body(
            "invalid_request_error",
            "messages must not be empty",
        )));
    }
    if request.max_tokens == 0 {
        return Ok(HttpResponse::BadRequest().json(error_body(
            "invalid_request_error",
            "max_tokens must be at least 1",
        )));
    }

    let ceiling = state.config.server.max_tokens_ceiling;
    let ctx = RequestContext::from_request(request, ceiling);
    if let Some(requested) = ctx.requested_max_tokens {
        warn!(
            request_id = %ctx.request_id,
            requested,
            ceiling,
            "max_tokens clamped to gateway ceiling"
        );
    }

    info!(
        request_id = %ctx.request_id,
        model = %ctx.model_alias,
        stream = ctx.stream,
        "processing request"
    );

    // Streaming is accepted on the wire and forwarded to backends, but the
    // gateway buffers the completion either way.
    let deadline = state.router.config().overall_budget() + DEADLINE_MARGIN;
    let routed = match tokio::time::timeout(deadline, state.router.dispatch(&ctx)).await {
        Ok(Ok(routed)) => routed,
        Ok(Err(err)) => {
            let rate_limited = match &err {
                RouterError::AllProvidersExhausted { attempts } => attempts
                    .iter()
                    .filter(|attempt| attempt.kind == FailureKind::RateLimited)
                    .count(),
                _ => 0,
            };
            state.stats.record_failure(rate_limited);
            return Ok(router_error_response(err));
        }
        Err(_elapsed) => {
            state.stats.record_failure(0);
            warn!(request_id = %ctx.request_id, "request exceeded overall deadline");
            return Ok(HttpResponse::GatewayTimeout().json(error_body(
                "timeout_error",
                "request exceeded the overall routing deadline",
            )));
        }
    };

    state
        .stats
        .record_success(routed.used_fallback(), routed.rate_limited_attempts());

    let mut response = MessagesResponse::new(
        routed.response.text,
        routed.provider,
        routed.model,
        routed.response.stop_reason,
        crate::core::types::Usage {
            input_tokens: routed.response.input_tokens,
            output_tokens: routed.response.output_tokens,
        },
    );
    response.max_tokens_clamped = ctx.requested_max_tokens;

    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::cost::{CostAccountant, CostAlerts, PricingTable};
    use crate::core::health::{HealthTracker, HealthTrackerConfig};
    use crate::core::providers::testing::FixedBackend;
    use crate::core::providers::{BackendError, Provider, ProviderRegistry};
    use crate::core::router::{FallbackRouter, RouterConfig};
    use crate::core::scoring::RoutingStrategy;
    use crate::server::routes;
    use crate::server::state::AppState;
    use actix_web::{test, web, App};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn provider(name: &str) -> Provider {
        Provider {
            name: name.to_string(),
            base_url: format!("http://localhost/{name}"),
            model_map: vec![("sonnet".to_string(), format!("{name}-native"))],
            rpm_limit: None,
            tpm_limit: None,
            timeout: None,
        }
    }

    fn state_with(backends: Vec<(&str, Arc<FixedBackend>)>) -> AppState {
        let mut registry = ProviderRegistry::new();
        for (name, backend) in backends {
            registry.register(provider(name), backend);
        }
        let registry = Arc::new(registry);
        let health = Arc::new(HealthTracker::new(HealthTrackerConfig::default()));
        let costs = Arc::new(CostAccountant::new(
            PricingTable::new(),
            CostAlerts::default(),
        ));
        let router = Arc::new(FallbackRouter::new(
            Arc::clone(&registry),
            Arc::clone(&health),
            Arc::clone(&costs),
            RouterConfig {
                fallback_delay: Duration::ZERO,
                attempt_timeout: Duration::from_secs(5),
                ..Default::default()
            },
            RoutingStrategy::Availability,
        ));
        AppState::new(Config::default(), registry, health, costs, router)
    }

    async fn post_messages(
        state: AppState,
        body: serde_json::Value,
    ) -> (u16, serde_json::Value) {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/v1/messages")
            .set_json(body)
            .to_request();
        let response = test::call_service(&app, req).await;
        let status = response.status().as_u16();
        let body: serde_json::Value = test::read_body_json(response).await;
        (status, body)
    }

    fn valid_body() -> serde_json::Value {
        json!({
            "model": "sonnet",
            "messages": [{"role": "user", "content": "hello"}],
            "max_tokens": 256
        })
    }

    #[actix_web::test]
    async fn test_happy_path_returns_wire_response() {
        let state = state_with(vec![("a", FixedBackend::ok("hi there"))]);
        let (status, body) = post_messages(state, valid_body()).await;

        assert_eq!(status, 200);
        assert_eq!(body["type"], "message");
        assert_eq!(body["role"], "assistant");
        assert_eq!(body["content"][0]["text"], "hi there");
        assert_eq!(body["provider"], "a");
        assert_eq!(body["model"], "a-native");
        assert_eq!(body["usage"]["input_tokens"], 10);
        assert_eq!(body["usage"]["output_tokens"], 20);
        assert!(body["id"].as_str().unwrap().starts_with("msg_"));
        assert!(body.get("max_tokens_clamped").is_none());
    }

    #[actix_web::test]
    async fn test_max_tokens_clamp_is_observable() {
        let state = state_with(vec![("a", FixedBackend::ok("hi"))]);
        let mut body = valid_body();
        body["max_tokens"] = json!(32_000);

        let (status, body) = post_messages(state, body).await;

        assert_eq!(status, 200);
        assert_eq!(body["max_tokens_clamped"], 32_000);
    }

    #[actix_web::test]
    async fn test_empty_messages_rejected() {
        let state = state_with(vec![("a", FixedBackend::ok("hi"))]);
        let mut body = valid_body();
        body["messages"] = json!([]);

        let (status, body) = post_messages(state, body).await;

        assert_eq!(status, 400);
        assert_eq!(body["error"]["type"], "invalid_request_error");
    }

    #[actix_web::test]
    async fn test_unknown_model_is_404_with_reason() {
        let state = state_with(vec![("a", FixedBackend::ok("hi"))]);
        let mut body = valid_body();
        body["model"] = json!("unknown-model");

        let (status, body) = post_messages(state, body).await;

        assert_eq!(status, 404);
        assert_eq!(body["error"]["type"], "no_eligible_provider");
        assert_eq!(body["error"]["reason"], "unmapped_model");
    }

    #[actix_web::test]
    async fn test_exhaustion_is_503_listing_every_attempt() {
        let state = state_with(vec![
            (
                "a",
                FixedBackend::err(BackendError::Timeout {
                    provider: "a".to_string(),
                }),
            ),
            (
                "b",
                FixedBackend::err(BackendError::Timeout {
                    provider: "b".to_string(),
                }),
            ),
        ]);

        let (status, body) = post_messages(state, valid_body()).await;

        assert_eq!(status, 503);
        assert_eq!(body["error"]["type"], "all_providers_exhausted");
        let attempts = body["error"]["attempts"].as_array().unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0]["provider"], "a");
        assert_eq!(attempts[0]["kind"], "timeout");
        assert_eq!(attempts[1]["provider"], "b");
    }

    #[actix_web::test]
    async fn test_bad_request_from_backend_is_400() {
        let state = state_with(vec![(
            "a",
            FixedBackend::err(BackendError::BadRequest {
                provider: "a".to_string(),
                message: "system prompt too long".to_string(),
            }),
        )]);

        let (status, body) = post_messages(state, valid_body()).await;

        assert_eq!(status, 400);
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(body["error"]["provider"], "a");
    }

    #[actix_web::test]
    async fn test_api_key_enforced_when_configured() {
        let mut state = state_with(vec![("a", FixedBackend::ok("hi"))]);
        let mut config = (*state.config).clone();
        config.server.api_key = Some("secret".to_string());
        state.config = Arc::new(config);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes::configure),
        )
        .await;

        let denied = test::TestRequest::post()
            .uri("/v1/messages")
            .set_json(valid_body())
            .to_request();
        let response = test::call_service(&app, denied).await;
        assert_eq!(response.status().as_u16(), 401);

        let allowed = test::TestRequest::post()
            .uri("/v1/messages")
            .insert_header(("authorization", "Bearer secret"))
            .set_json(valid_body())
            .to_request();
        let response = test::call_service(&app, allowed).await;
        assert_eq!(response.status().as_u16(), 200);
    }
}
