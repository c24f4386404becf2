//! Retry/fallback state machine for model invocation.
//!
//! The primary model gets up to `max_retries` attempts, each bounded by
//! `attempt_timeout`:
//!
//! - timeout: back off and retry; on the final attempt the request is fatal
//! - empty response: back off and retry; on the final attempt the fallback
//!   model (if any) gets exactly one attempt, whose outcome is final
//! - anything else: fatal immediately
//!
//! Only the model call is bounded by the timeout; tool calls made during an
//! attempt count against it.

use std::time::Duration;

use serde::Serialize;

use repolens_types::config::RetryConfig;
use repolens_types::llm::{FailureClass, LlmError, Message};

use crate::llm::invoker::ModelInvoker;
use crate::llm::tool::ToolExecutor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub attempt_timeout: Duration,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            attempt_timeout: Duration::from_secs(config.attempt_timeout_secs),
            backoff: Duration::from_secs(config.backoff_secs),
        }
    }
}

/// What one model invocation is asked to do.
pub struct Invocation<'a> {
    pub system_prompt: &'a str,
    pub history: &'a [Message],
    pub query: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Timeout,
    TransientError,
    TerminalError,
}

/// One try against a model. Lives only for the duration of a request.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationAttempt {
    pub provider: String,
    pub model: String,
    pub number: u32,
    pub timeout_secs: u64,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("request timed out")]
    TimedOut,

    #[error("fallback model failed: {0}")]
    Fallback(#[source] LlmError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl InvocationError {
    pub fn failure_class(&self) -> FailureClass {
        match self {
            InvocationError::TimedOut => FailureClass::Timeout,
            InvocationError::Fallback(err) | InvocationError::Llm(err) => err.failure_class(),
        }
    }
}

/// Terminal state of the machine plus the attempts that led there.
#[derive(Debug)]
pub struct InvocationReport {
    pub outcome: Result<String, InvocationError>,
    pub attempts: Vec<InvocationAttempt>,
    /// Provider that produced the final answer or error.
    pub provider: String,
    pub used_fallback: bool,
}

impl RetryPolicy {
    pub async fn run<E: ToolExecutor>(
        &self,
        primary: &ModelInvoker,
        fallback: Option<&ModelInvoker>,
        invocation: &Invocation<'_>,
        tools: &E,
    ) -> InvocationReport {
        let mut attempts = Vec::new();
        let max = self.max_retries.max(1);
        let mut number = 0;

        loop {
            number += 1;
            let is_final = number >= max;
            let err = match self.attempt(primary, number, invocation, tools, &mut attempts).await {
                Ok(text) => return report(Ok(text), attempts, primary, false),
                Err(err) => err,
            };

            match err.failure_class() {
                FailureClass::Timeout if is_final => {
                    tracing::error!(provider = %primary.provider_name(), attempts = number, "model timed out on final attempt");
                    return report(Err(InvocationError::TimedOut), attempts, primary, false);
                }
                FailureClass::EmptyResponse if is_final => {
                    return self
                        .fall_back(primary, fallback, err, invocation, tools, attempts)
                        .await;
                }
                FailureClass::Timeout | FailureClass::EmptyResponse => {
                    tracing::warn!(
                        provider = %primary.provider_name(),
                        attempt = number,
                        max_retries = max,
                        error = %err,
                        "model attempt failed, retrying after backoff"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                FailureClass::Other => {
                    tracing::error!(provider = %primary.provider_name(), error = %err, "non-retryable model error");
                    return report(Err(InvocationError::Llm(err)), attempts, primary, false);
                }
            }
        }
    }

    async fn fall_back<E: ToolExecutor>(
        &self,
        primary: &ModelInvoker,
        fallback: Option<&ModelInvoker>,
        last_error: LlmError,
        invocation: &Invocation<'_>,
        tools: &E,
        mut attempts: Vec<InvocationAttempt>,
    ) -> InvocationReport {
        let Some(fallback) = fallback else {
            tracing::error!(provider = %primary.provider_name(), error = %last_error, "primary model exhausted and no fallback configured");
            return report(Err(InvocationError::Llm(last_error)), attempts, primary, false);
        };

        tracing::warn!(
            from = %primary.provider_name(),
            to = %fallback.provider_name(),
            model = %fallback.model(),
            "primary model kept returning empty responses, switching to fallback"
        );

        let outcome = match self.attempt(fallback, 1, invocation, tools, &mut attempts).await {
            Ok(text) => Ok(text),
            Err(err) if err.failure_class() == FailureClass::Timeout => Err(InvocationError::TimedOut),
            Err(err) => Err(InvocationError::Fallback(err)),
        };
        if let Err(err) = &outcome {
            tracing::error!(provider = %fallback.provider_name(), error = %err, "fallback model failed");
        }
        report(outcome, attempts, fallback, true)
    }

    async fn attempt<E: ToolExecutor>(
        &self,
        invoker: &ModelInvoker,
        number: u32,
        invocation: &Invocation<'_>,
        tools: &E,
        attempts: &mut Vec<InvocationAttempt>,
    ) -> Result<String, LlmError> {
        tracing::debug!(provider = %invoker.provider_name(), attempt = number, "invoking model");

        let call = invoker.invoke(
            invocation.system_prompt,
            invocation.history,
            invocation.query,
            tools,
        );
        let result = match tokio::time::timeout(self.attempt_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(format!(
                "no response within {}s",
                self.attempt_timeout.as_secs()
            ))),
        };

        let outcome = match &result {
            Ok(_) => AttemptOutcome::Success,
            Err(err) => match err.failure_class() {
                FailureClass::Timeout => AttemptOutcome::Timeout,
                FailureClass::EmptyResponse => AttemptOutcome::TransientError,
                FailureClass::Other => AttemptOutcome::TerminalError,
            },
        };
        attempts.push(InvocationAttempt {
            provider: invoker.provider_name().to_string(),
            model: invoker.model().to_string(),
            number,
            timeout_secs: self.attempt_timeout.as_secs(),
            outcome,
        });

        result
    }
}

fn report(
    outcome: Result<String, InvocationError>,
    attempts: Vec<InvocationAttempt>,
    invoker: &ModelInvoker,
    used_fallback: bool,
) -> InvocationReport {
    InvocationReport {
        outcome,
        attempts,
        provider: invoker.provider_name().to_string(),
        used_fallback,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::llm::box_provider::BoxLlmProvider;
    use crate::llm::provider::LlmProvider;
    use repolens_types::llm::{
        CompletionRequest, CompletionResponse, StopReason, ToolCall, ToolDefinition, Usage,
    };
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// What a mock provider does on one call.
    #[derive(Clone)]
    pub(crate) enum Step {
        Answer(&'static str),
        /// Never answers within any sane deadline.
        Hang,
        Empty,
        TransportTimeout,
        AuthFailure,
    }

    /// Plays `steps` in order, repeating the last one forever.
    pub(crate) struct MockProvider {
        name: &'static str,
        steps: Mutex<VecDeque<Step>>,
        last: Mutex<Step>,
        pub(crate) calls: Arc<AtomicUsize>,
        pub(crate) requests: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl MockProvider {
        pub(crate) fn new(name: &'static str, steps: Vec<Step>) -> Self {
            let last = steps.last().cloned().unwrap_or(Step::Answer("ok"));
            Self {
                name,
                steps: Mutex::new(steps.into()),
                last: Mutex::new(last),
                calls: Arc::new(AtomicUsize::new(0)),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl LlmProvider for MockProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        fn complete(
            &self,
            request: &CompletionRequest,
        ) -> impl Future<Output = Result<CompletionResponse, LlmError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            let step = self
                .steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.last.lock().unwrap().clone());
            let name = self.name;
            async move {
                let content = match step {
                    Step::Answer(text) => text.to_string(),
                    Step::Empty => String::new(),
                    Step::Hang => {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        "too late".to_string()
                    }
                    Step::TransportTimeout => {
                        return Err(LlmError::Timeout("operation timed out".into()));
                    }
                    Step::AuthFailure => return Err(LlmError::AuthenticationFailed),
                };
                Ok(CompletionResponse {
                    id: format!("resp-{name}"),
                    content,
                    model: "mock-model".into(),
                    stop_reason: StopReason::EndTurn,
                    usage: Usage::default(),
                    tool_calls: Vec::new(),
                })
            }
        }
    }

    pub(crate) struct NoTools;

    impl ToolExecutor for NoTools {
        fn definitions(&self) -> Vec<ToolDefinition> {
            Vec::new()
        }

        async fn execute(&self, _call: &ToolCall) -> String {
            String::new()
        }
    }

    fn invoker(name: &'static str, steps: Vec<Step>) -> (ModelInvoker, Arc<AtomicUsize>) {
        let provider = MockProvider::new(name, steps);
        let calls = provider.calls.clone();
        (ModelInvoker::new(BoxLlmProvider::new(provider)), calls)
    }

    async fn run(
        primary: &ModelInvoker,
        fallback: Option<&ModelInvoker>,
    ) -> InvocationReport {
        let invocation = Invocation {
            system_prompt: "sys",
            history: &[],
            query: "q",
        };
        RetryPolicy::default()
            .run(primary, fallback, &invocation, &NoTools)
            .await
    }

    #[test]
    fn default_policy_constants() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(45));
        assert_eq!(policy.backoff, Duration::from_secs(2));
    }

    #[test]
    fn zero_retries_still_attempts_once() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        });
        assert_eq!(policy.max_retries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn two_timeouts_then_success() {
        let (primary, calls) = invoker("primary", vec![Step::Hang, Step::Hang, Step::Answer("hi")]);
        let started = tokio::time::Instant::now();

        let report = run(&primary, None).await;

        assert_eq!(report.outcome.unwrap(), "hi");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let outcomes: Vec<_> = report.attempts.iter().map(|a| a.outcome).collect();
        assert_eq!(
            outcomes,
            vec![AttemptOutcome::Timeout, AttemptOutcome::Timeout, AttemptOutcome::Success]
        );
        // Two full deadlines plus two backoffs.
        assert!(started.elapsed() >= Duration::from_secs(2 * 45 + 2 * 2));
        assert!(!report.used_fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_on_final_attempt_is_fatal_without_fallback() {
        let (primary, primary_calls) = invoker("primary", vec![Step::TransportTimeout]);
        let (fallback, fallback_calls) = invoker("fallback", vec![Step::Answer("unused")]);

        let report = run(&primary, Some(&fallback)).await;

        assert!(matches!(report.outcome, Err(InvocationError::TimedOut)));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 3);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_responses_fall_back_exactly_once() {
        let (primary, primary_calls) = invoker("primary", vec![Step::Empty]);
        let (fallback, fallback_calls) = invoker("fallback", vec![Step::Answer("from fallback")]);

        let report = run(&primary, Some(&fallback)).await;

        assert_eq!(report.outcome.unwrap(), "from fallback");
        assert!(report.used_fallback);
        assert_eq!(report.provider, "fallback");
        assert_eq!(primary_calls.load(Ordering::SeqCst), 3);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.attempts.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fallback_is_final() {
        let (primary, _) = invoker("primary", vec![Step::Empty]);
        let (fallback, fallback_calls) = invoker("fallback", vec![Step::Empty]);

        let report = run(&primary, Some(&fallback)).await;

        let err = report.outcome.unwrap_err();
        assert!(matches!(err, InvocationError::Fallback(_)));
        assert_eq!(err.failure_class(), FailureClass::EmptyResponse);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_timeout_reports_timed_out() {
        let (primary, _) = invoker("primary", vec![Step::Empty]);
        let (fallback, fallback_calls) = invoker("fallback", vec![Step::Hang]);

        let report = run(&primary, Some(&fallback)).await;

        assert!(matches!(report.outcome, Err(InvocationError::TimedOut)));
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_without_fallback_surfaces_last_error() {
        let (primary, calls) = invoker("primary", vec![Step::Empty]);

        let report = run(&primary, None).await;

        let err = report.outcome.unwrap_err();
        assert!(matches!(err, InvocationError::Llm(LlmError::EmptyResponse(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_are_fatal_immediately() {
        let (primary, primary_calls) = invoker("primary", vec![Step::AuthFailure]);
        let (fallback, fallback_calls) = invoker("fallback", vec![Step::Answer("unused")]);

        let report = run(&primary, Some(&fallback)).await;

        assert!(matches!(
            report.outcome,
            Err(InvocationError::Llm(LlmError::AuthenticationFailed))
        ));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.attempts[0].outcome, AttemptOutcome::TerminalError);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_then_empty_on_final_attempt_falls_back() {
        let (primary, _) = invoker("primary", vec![Step::Hang, Step::Empty, Step::Empty]);
        let (fallback, fallback_calls) = invoker("fallback", vec![Step::Answer("rescued")]);

        let report = run(&primary, Some(&fallback)).await;

        assert_eq!(report.outcome.unwrap(), "rescued");
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }
}
