//! `POST /api/agent` -- answer one query within a session.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::AgentResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    pub query: String,
    pub user_id: String,
    pub request_id: String,
    pub session_id: String,
}

/// Run the orchestrator on a spawned task so a client disconnect cannot
/// cancel it between the two turn writes.
pub async fn run_agent(
    _auth: Authenticated,
    State(state): State<AppState>,
    payload: Result<Json<AgentRequest>, JsonRejection>,
) -> Result<Json<AgentResponse>, AppError> {
    let Json(req) = payload?;
    tracing::info!(
        session_id = %req.session_id,
        request_id = %req.request_id,
        user_id = %req.user_id,
        "agent request"
    );

    let orchestrator = state.orchestrator.clone();
    let outcome = tokio::spawn(async move {
        orchestrator
            .handle(&req.query, &req.session_id, &req.request_id)
            .await
    })
    .await
    .map_err(|e| AppError::Internal(format!("agent task failed: {e}")))??;

    Ok(Json(AgentResponse::from(outcome)))
}
