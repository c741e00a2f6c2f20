//! HTTP router assembly

use axum::middleware;
use axum::routing::get;
use axum::Router;

use super::middleware::{logging_middleware, security_headers_middleware};
use super::state::AppState;
use super::{health, v1};

/// Builds the full application router over the given state.
pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .nest("/v1", v1::create_v1_router())
        .with_state(state)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
