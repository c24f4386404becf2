//! Orchestrator -- one inbound query end to end.
//!
//! Load recent history, record the human turn, run the retry/fallback
//! policy against the model, record exactly one assistant turn, and hand
//! back an envelope the transport layer can serialize.

use std::time::Duration;

use serde_json::json;

use repolens_types::conversation::Turn;
use repolens_types::error::RepositoryError;
use repolens_types::llm::{FailureClass, Message};

use super::policy::{Invocation, InvocationError, RetryPolicy};
use super::prompt::SYSTEM_PROMPT;
use crate::conversation::store::ConversationStore;
use crate::llm::invoker::ModelInvoker;
use crate::llm::tool::ToolExecutor;

/// Shown to the user, and stored as the assistant turn, whenever the model
/// could not produce an answer.
pub const APOLOGY: &str =
    "Sorry, I couldn't answer that right now. Please try again in a moment.";

/// User-facing error text for requests that ran out of time.
pub const TIMEOUT_MESSAGE: &str = "The request timed out. Please try again.";

/// Default number of prior turns sent to the model.
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("failed to load conversation history: {0}")]
    LoadHistory(#[source] RepositoryError),

    #[error("failed to store conversation turn: {0}")]
    StoreTurn(#[source] RepositoryError),
}

/// Result of one handled query.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub success: bool,
    pub response_text: Option<String>,
    /// Fixed user-facing text; never the underlying error.
    pub error: Option<String>,
    pub error_type: Option<FailureClass>,
    pub elapsed: Duration,
    /// Provider that produced the final answer or error.
    pub provider: String,
}

pub struct Orchestrator<C, E> {
    store: C,
    tools: E,
    primary: ModelInvoker,
    fallback: Option<ModelInvoker>,
    policy: RetryPolicy,
    history_limit: u32,
}

impl<C: ConversationStore, E: ToolExecutor> Orchestrator<C, E> {
    pub fn new(store: C, tools: E, primary: ModelInvoker) -> Self {
        Self {
            store,
            tools,
            primary,
            fallback: None,
            policy: RetryPolicy::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_fallback(mut self, fallback: Option<ModelInvoker>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    pub fn primary(&self) -> &ModelInvoker {
        &self.primary
    }

    pub fn fallback(&self) -> Option<&ModelInvoker> {
        self.fallback.as_ref()
    }

    /// Handle one query for `session_id`.
    ///
    /// Model failures are not errors here: they produce an unsuccessful
    /// [`AgentOutcome`] and an apology turn. Only persistence failures are
    /// returned as `Err`, and a failed history load stores nothing.
    pub async fn handle(
        &self,
        query: &str,
        session_id: &str,
        request_id: &str,
    ) -> Result<AgentOutcome, OrchestratorError> {
        let started = tokio::time::Instant::now();

        let history = self
            .store
            .recent_turns(session_id, self.history_limit)
            .await
            .map_err(OrchestratorError::LoadHistory)?;
        tracing::debug!(session_id = %session_id, turns = history.len(), "loaded conversation history");
        let messages: Vec<Message> = history.iter().map(Turn::to_message).collect();

        let human = Turn::human(query).with_data(json!({ "request_id": request_id }));
        self.store
            .append_turn(session_id, &human)
            .await
            .map_err(OrchestratorError::StoreTurn)?;

        let invocation = Invocation {
            system_prompt: SYSTEM_PROMPT,
            history: &messages,
            query,
        };
        let report = self
            .policy
            .run(&self.primary, self.fallback.as_ref(), &invocation, &self.tools)
            .await;
        let attempts = serde_json::to_value(&report.attempts).unwrap_or_default();

        let (assistant, outcome) = match report.outcome {
            Ok(answer) => {
                let turn = Turn::assistant(answer.clone()).with_data(json!({
                    "request_id": request_id,
                    "provider": report.provider,
                    "used_fallback": report.used_fallback,
                    "attempts": attempts,
                }));
                let outcome = AgentOutcome {
                    success: true,
                    response_text: Some(answer),
                    error: None,
                    error_type: None,
                    elapsed: started.elapsed(),
                    provider: report.provider,
                };
                (turn, outcome)
            }
            Err(err) => {
                let class = err.failure_class();
                tracing::error!(
                    session_id = %session_id,
                    request_id = %request_id,
                    error = %err,
                    error_type = %class,
                    "query failed"
                );
                let turn = Turn::assistant(APOLOGY).with_data(json!({
                    "request_id": request_id,
                    "provider": report.provider,
                    "error": err.to_string(),
                    "error_type": class,
                    "attempts": attempts,
                }));
                let outcome = AgentOutcome {
                    success: false,
                    response_text: None,
                    error: Some(user_message(&err).to_string()),
                    error_type: Some(class),
                    elapsed: started.elapsed(),
                    provider: report.provider,
                };
                (turn, outcome)
            }
        };

        self.store
            .append_turn(session_id, &assistant)
            .await
            .map_err(OrchestratorError::StoreTurn)?;

        tracing::info!(
            session_id = %session_id,
            request_id = %request_id,
            success = outcome.success,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "query handled"
        );
        Ok(outcome)
    }
}

fn user_message(err: &InvocationError) -> &'static str {
    match err {
        InvocationError::TimedOut => TIMEOUT_MESSAGE,
        _ => APOLOGY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::policy::tests::{MockProvider, NoTools, Step};
    use crate::conversation::store::tests::MemoryConversationStore;
    use crate::llm::box_provider::BoxLlmProvider;
    use repolens_types::conversation::TurnKind;
    use repolens_types::llm::MessageRole;
    use std::sync::atomic::Ordering;

    fn orchestrator(
        store: MemoryConversationStore,
        primary: MockProvider,
    ) -> Orchestrator<MemoryConversationStore, NoTools> {
        Orchestrator::new(store, NoTools, ModelInvoker::new(BoxLlmProvider::new(primary)))
    }

    fn kinds(turns: &[Turn]) -> Vec<TurnKind> {
        turns.iter().map(|t| t.kind).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn success_persists_both_turns() {
        let store = MemoryConversationStore::default();
        let orch = orchestrator(store.clone(), MockProvider::new("primary", vec![Step::Answer("42")]));

        let outcome = orch.handle("what?", "s1", "r1").await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.response_text.as_deref(), Some("42"));
        assert!(outcome.error.is_none());
        let turns = store.session("s1");
        assert_eq!(kinds(&turns), vec![TurnKind::Human, TurnKind::Assistant]);
        assert_eq!(turns[0].content, "what?");
        assert_eq!(turns[0].data.as_ref().unwrap()["request_id"], "r1");
        assert_eq!(turns[1].content, "42");
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_two_timeouts() {
        let store = MemoryConversationStore::default();
        let orch = orchestrator(
            store.clone(),
            MockProvider::new("primary", vec![Step::Hang, Step::Hang, Step::Answer("late but fine")]),
        );

        let outcome = orch.handle("q", "s1", "r1").await.unwrap();

        assert!(outcome.success);
        assert!(outcome.elapsed >= Duration::from_secs(94));
        assert_eq!(store.session("s1").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn final_timeout_stores_apology_and_reports_timeout() {
        let store = MemoryConversationStore::default();
        let orch = orchestrator(store.clone(), MockProvider::new("primary", vec![Step::Hang]));

        let outcome = orch.handle("q", "s1", "r1").await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some(TIMEOUT_MESSAGE));
        assert_eq!(outcome.error_type, Some(FailureClass::Timeout));
        let turns = store.session("s1");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, APOLOGY);
        let data = turns[1].data.as_ref().unwrap();
        assert_eq!(data["error_type"], "timeout");
        assert_eq!(data["attempts"].as_array().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_primary_uses_fallback() {
        let store = MemoryConversationStore::default();
        let fallback = MockProvider::new("fallback", vec![Step::Answer("fallback answer")]);
        let fallback_calls = fallback.calls.clone();
        let orch = orchestrator(store.clone(), MockProvider::new("primary", vec![Step::Empty]))
            .with_fallback(Some(ModelInvoker::new(BoxLlmProvider::new(fallback))));

        let outcome = orch.handle("q", "s1", "r1").await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.provider, "fallback");
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
        let turns = store.session("s1");
        assert_eq!(turns[1].content, "fallback answer");
        assert_eq!(turns[1].data.as_ref().unwrap()["used_fallback"], true);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fallback_stores_apology_with_diagnostics() {
        let store = MemoryConversationStore::default();
        let fallback = MockProvider::new("fallback", vec![Step::AuthFailure]);
        let orch = orchestrator(store.clone(), MockProvider::new("primary", vec![Step::Empty]))
            .with_fallback(Some(ModelInvoker::new(BoxLlmProvider::new(fallback))));

        let outcome = orch.handle("q", "s1", "r1").await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some(APOLOGY));
        let turns = store.session("s1");
        assert_eq!(turns[1].content, APOLOGY);
        let detail = turns[1].data.as_ref().unwrap()["error"].as_str().unwrap().to_string();
        assert!(detail.contains("fallback"));
        assert!(!outcome.error.unwrap().contains("fallback model failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_makes_one_call() {
        let store = MemoryConversationStore::default();
        let primary = MockProvider::new("primary", vec![Step::AuthFailure]);
        let calls = primary.calls.clone();
        let orch = orchestrator(store.clone(), primary);

        let outcome = orch.handle("q", "s1", "r1").await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.error_type, Some(FailureClass::Other));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.session("s1").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn history_load_failure_stores_nothing() {
        let store = MemoryConversationStore {
            fail_loads: true,
            ..Default::default()
        };
        let primary = MockProvider::new("primary", vec![Step::Answer("unused")]);
        let calls = primary.calls.clone();
        let orch = orchestrator(store.clone(), primary);

        let err = orch.handle("q", "s1", "r1").await.unwrap_err();

        assert!(matches!(err, OrchestratorError::LoadHistory(_)));
        assert!(store.turns.lock().unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn inbound_persist_failure_skips_the_model() {
        let store = MemoryConversationStore {
            fail_append_number: Some(1),
            ..Default::default()
        };
        let primary = MockProvider::new("primary", vec![Step::Answer("unused")]);
        let calls = primary.calls.clone();
        let orch = orchestrator(store.clone(), primary);

        let err = orch.handle("q", "s1", "r1").await.unwrap_err();

        assert!(matches!(err, OrchestratorError::StoreTurn(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn outbound_persist_failure_is_an_error() {
        let store = MemoryConversationStore {
            fail_append_number: Some(2),
            ..Default::default()
        };
        let orch = orchestrator(store.clone(), MockProvider::new("primary", vec![Step::Answer("42")]));

        let err = orch.handle("q", "s1", "r1").await.unwrap_err();

        assert!(matches!(err, OrchestratorError::StoreTurn(_)));
        assert_eq!(kinds(&store.session("s1")), vec![TurnKind::Human]);
    }

    #[tokio::test(start_paused = true)]
    async fn history_is_limited_and_ordered_before_the_query() {
        let store = MemoryConversationStore::default();
        for i in 0..6 {
            store.append_turn("s1", &Turn::human(format!("q{i}"))).await.unwrap();
            store.append_turn("s1", &Turn::assistant(format!("a{i}"))).await.unwrap();
        }
        let primary = MockProvider::new("primary", vec![Step::Answer("ok")]);
        let requests = primary.requests.clone();
        let orch = orchestrator(store.clone(), primary).with_history_limit(4);

        orch.handle("latest", "s1", "r1").await.unwrap();

        let requests = requests.lock().unwrap();
        let messages = &requests[0].messages;
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["q4", "a4", "q5", "a5", "latest"]);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
    }

    #[tokio::test(start_paused = true)]
    async fn every_query_gets_exactly_one_reply_turn() {
        let store = MemoryConversationStore::default();
        let orch = orchestrator(
            store.clone(),
            MockProvider::new(
                "primary",
                vec![Step::Answer("a"), Step::AuthFailure, Step::Empty, Step::Empty, Step::Empty, Step::Answer("b")],
            ),
        );

        for i in 0..3 {
            orch.handle(&format!("q{i}"), "s1", &format!("r{i}")).await.unwrap();
        }

        let turns = store.session("s1");
        let humans = turns.iter().filter(|t| t.kind == TurnKind::Human).count();
        let replies = turns.iter().filter(|t| t.kind == TurnKind::Assistant).count();
        assert_eq!(humans, 3);
        assert_eq!(replies, 3);
        assert_eq!(
            kinds(&turns),
            vec![
                TurnKind::Human,
                TurnKind::Assistant,
                TurnKind::Human,
                TurnKind::Assistant,
                TurnKind::Human,
                TurnKind::Assistant,
            ]
        );
    }
}
