//! ModelInvoker -- one configured provider plus the tool-calling loop.
//!
//! An invocation sends the system prompt, prior turns and the new query
//! together with the tool definitions. While the model answers with tool
//! calls, each call is executed through the [`ToolExecutor`] and its text
//! result appended as a tool message; the first plain answer ends the loop.

use repolens_types::llm::{CompletionRequest, LlmError, Message};

use super::box_provider::BoxLlmProvider;
use super::tool::ToolExecutor;

/// Upper bound on model round-trips that request tools within one invocation.
pub const MAX_TOOL_ROUNDS: usize = 8;

pub struct ModelInvoker {
    provider: BoxLlmProvider,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
}

impl ModelInvoker {
    pub fn new(provider: BoxLlmProvider) -> Self {
        Self {
            provider,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Run one invocation to a final text answer.
    ///
    /// # Errors
    ///
    /// Provider errors are returned unchanged. A final answer with blank
    /// content is [`LlmError::EmptyResponse`]; running out of tool rounds is
    /// [`LlmError::Provider`].
    pub async fn invoke<E: ToolExecutor>(
        &self,
        system_prompt: &str,
        history: &[Message],
        query: &str,
        tools: &E,
    ) -> Result<String, LlmError> {
        let mut messages = history.to_vec();
        messages.push(Message::user(query));
        let definitions = tools.definitions();

        for round in 0..MAX_TOOL_ROUNDS {
            let request = CompletionRequest {
                model: self.model().to_string(),
                messages: messages.clone(),
                system: Some(system_prompt.to_string()),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
                tools: definitions.clone(),
            };

            let response = self.provider.complete(&request).await?;

            if response.tool_calls.is_empty() {
                if response.content.trim().is_empty() {
                    return Err(LlmError::EmptyResponse(format!(
                        "{} returned no content",
                        self.provider_name()
                    )));
                }
                return Ok(response.content);
            }

            tracing::debug!(
                provider = %self.provider_name(),
                round,
                calls = response.tool_calls.len(),
                "model requested tools"
            );

            let calls = response.tool_calls;
            messages.push(Message::assistant_tool_calls(response.content, calls.clone()));
            for call in &calls {
                let output = tools.execute(call).await;
                tracing::debug!(tool = %call.name, bytes = output.len(), "tool finished");
                messages.push(Message::tool_result(call.id.clone(), output));
            }
        }

        Err(LlmError::Provider {
            message: format!("tool loop limit reached ({MAX_TOOL_ROUNDS} rounds)"),
        })
    }
}
