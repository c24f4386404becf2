//! Response body for `POST /api/agent`.

use serde::Serialize;

use repolens_core::agent::orchestrator::AgentOutcome;

/// `{success, response?, error?, error_type?, elapsed_time?}`
#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<f64>,
}

impl From<AgentOutcome> for AgentResponse {
    fn from(outcome: AgentOutcome) -> Self {
        Self {
            success: outcome.success,
            response: outcome.response_text,
            error: outcome.error,
            error_type: outcome.error_type.map(|class| class.to_string()),
            elapsed_time: Some(outcome.elapsed.as_secs_f64()),
        }
    }
}
