//! Liveness and dependency health checks.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use repolens_core::conversation::store::ConversationStore;

use crate::state::AppState;

/// `GET /health`: the process is up.
pub async fn liveness() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /api/health`: the conversation store answers.
pub async fn dependency_health(State(state): State<AppState>) -> Json<Value> {
    let store_ok = match state.orchestrator.store().ping().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "conversation store health check failed");
            false
        }
    };
    Json(store_health(store_ok, chrono::Utc::now()))
}

fn store_health(store_ok: bool, now: chrono::DateTime<chrono::Utc>) -> Value {
    json!({
        "status": if store_ok { "ok" } else { "error" },
        "store": if store_ok { "connected" } else { "unavailable" },
        "timestamp": now.to_rfc3339(),
    })
}
