//! Admin and introspection endpoints
//!
//! Thin wrappers over the router, health tracker, and cost accountant.

use super::{authorize, error_body};
use crate::core::cost::CostPeriod;
use crate::core::scoring::RoutingStrategy;
use crate::server::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use serde::Deserialize;
use serde_json::json;

/// Aggregate gateway statistics: request counters, cost totals, and
/// per-provider usage.
pub async fn stats(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let provider_usage: serde_json::Map<String, serde_json::Value> = state
        .costs
        .provider_stats()
        .into_iter()
        .map(|(name, stats)| (name, serde_json::to_value(stats).unwrap_or_default()))
        .collect();

    let (hourly_breached, hourly_total) = state.costs.over_threshold(CostPeriod::Hourly);
    let (daily_breached, daily_total) = state.costs.over_threshold(CostPeriod::Daily);

    Ok(HttpResponse::Ok().json(json!({
        "routing_strategy": state.router.strategy(),
        "requests": state.stats.snapshot(),
        "cost": {
            "total": state.costs.total_cost(),
            "hourly": { "total": hourly_total, "over_threshold": hourly_breached },
            "daily": { "total": daily_total, "over_threshold": daily_breached },
            "providers": provider_usage,
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct StrategyUpdate {
    pub strategy: String,
}

/// Switch the routing strategy at runtime.
pub async fn update_routing_strategy(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<StrategyUpdate>,
) -> ActixResult<HttpResponse> {
    if let Some(rejection) = authorize(&state, &req) {
        return Ok(rejection);
    }

    match body.strategy.parse::<RoutingStrategy>() {
        Ok(strategy) => {
            state.router.set_strategy(strategy);
            Ok(HttpResponse::Ok().json(json!({
                "message": format!("routing strategy updated to {strategy}"),
            })))
        }
        Err(err) => Ok(HttpResponse::BadRequest().json(error_body("invalid_request_error", err))),
    }
}

/// Detailed health snapshot for one provider.
pub async fn provider_health(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    if let Some(rejection) = authorize(&state, &req) {
        return Ok(rejection);
    }

    let name = path.into_inner();
    if state.registry.get(&name).is_none() {
        return Ok(HttpResponse::NotFound().json(error_body(
            "not_found_error",
            format!("provider '{name}' is not configured"),
        )));
    }

    Ok(HttpResponse::Ok().json(json!({
        "provider": name,
        "health": state.health.snapshot(&name),
    })))
}
