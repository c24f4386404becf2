//! Axum router configuration with middleware.
//!
//! Middleware: CORS (allow any), request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/agent", post(handlers::agent::run_agent))
        .route("/api/health", get(handlers::health::dependency_health))
        .route("/health", get(handlers::health::liveness))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
