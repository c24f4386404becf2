//! OpenAI-compatible LLM provider implementation.
//!
//! A single [`OpenAiCompatibleProvider`] serves OpenAI, OpenRouter and any
//! other endpoint speaking `/chat/completions` with function calling, via
//! configurable base URLs and factory functions.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is only exposed
//! when building the `Authorization` header.

pub mod config;
pub mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use repolens_core::llm::provider::LlmProvider;
use repolens_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, StopReason, ToolCall, Usage,
};

use self::config::OpenAiCompatConfig;
use self::types::{
    ChatFunctionCall, ChatFunctionDef, ChatMessage, ChatRequest, ChatResponse, ChatTool,
    ChatToolCall,
};

/// Transport-level ceiling; the retry policy applies its own, shorter bound.
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Unified provider for any OpenAI-compatible API.
///
/// Does NOT derive Debug so the API key can never end up in logs.
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    provider_name: String,
    base_url: String,
    api_key: SecretString,
    model: String,
    extra_headers: Vec<(String, String)>,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            provider_name: config.provider_name,
            base_url: config.base_url,
            api_key: config.api_key,
            model: config.model,
            extra_headers: config.extra_headers,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Convert a generic [`CompletionRequest`] into the wire request.
    fn build_request(&self, request: &CompletionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".into(),
                content: Some(system.clone()),
                tool_calls: Vec::new(),
                tool_call_id: None,
            });
        }

        for msg in &request.messages {
            let content = match msg.role {
                MessageRole::Assistant if msg.content.is_empty() && !msg.tool_calls.is_empty() => None,
                _ => Some(msg.content.clone()),
            };
            messages.push(ChatMessage {
                role: msg.role.to_string(),
                content,
                tool_calls: msg
                    .tool_calls
                    .iter()
                    .map(|call| ChatToolCall {
                        id: call.id.clone(),
                        kind: "function".into(),
                        function: ChatFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    })
                    .collect(),
                tool_call_id: msg.tool_call_id.clone(),
            });
        }

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        ChatRequest {
            model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: request
                .tools
                .iter()
                .map(|tool| ChatTool {
                    kind: "function",
                    function: ChatFunctionDef {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    },
                })
                .collect(),
        }
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.build_request(request);

        let mut http = self
            .client
            .post(self.url("/chat/completions"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body);
        for (name, value) in &self.extra_headers {
            http = http.header(name.as_str(), value.as_str());
        }

        let response = http.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(map_status(status, error_body));
        }

        let body = response.text().await.map_err(map_reqwest_error)?;
        parse_completion(&body, &self.provider_name)
    }
}

/// Parse a 2xx body. A body that is not a chat completion counts as an
/// empty response so the retry policy treats it the same way.
fn parse_completion(body: &str, provider: &str) -> Result<CompletionResponse, LlmError> {
    let chat: ChatResponse = serde_json::from_str(body).map_err(|e| {
        LlmError::EmptyResponse(format!("Unexpected response format from {provider}: {e}"))
    })?;
    into_completion(chat, provider)
}

fn map_reqwest_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout(err.to_string())
    } else {
        LlmError::Provider {
            message: format!("HTTP request failed: {err}"),
        }
    }
}

/// Classify a non-2xx status.
fn map_status(status: u16, body: String) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: None,
        },
        503 | 529 => LlmError::Overloaded(body),
        400 | 404 | 422 => LlmError::InvalidRequest(format!("HTTP {status}: {body}")),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

/// Turn a parsed wire response into a [`CompletionResponse`], treating
/// missing choices or blank answers as [`LlmError::EmptyResponse`].
fn into_completion(chat: ChatResponse, provider: &str) -> Result<CompletionResponse, LlmError> {
    let Some(choice) = chat.choices.into_iter().next() else {
        return Err(LlmError::EmptyResponse(format!("Empty response from {provider}")));
    };

    let (content, tool_calls) = match (choice.message, choice.text) {
        (Some(message), _) => (
            message.content.unwrap_or_default(),
            message.tool_calls.unwrap_or_default(),
        ),
        (None, Some(text)) => (text, Vec::new()),
        (None, None) => {
            return Err(LlmError::EmptyResponse(format!(
                "Unexpected response format from {provider}"
            )));
        }
    };

    if tool_calls.is_empty() && content.trim().is_empty() {
        return Err(LlmError::EmptyResponse(format!("Empty response from {provider}")));
    }

    let stop_reason = choice
        .finish_reason
        .as_deref()
        .and_then(|r| r.parse::<StopReason>().ok())
        .unwrap_or(if tool_calls.is_empty() {
            StopReason::EndTurn
        } else {
            StopReason::ToolUse
        });

    let usage = chat
        .usage
        .map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        id: chat.id,
        content,
        model: chat.model,
        stop_reason,
        usage,
        tool_calls: tool_calls
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect(),
    })
}
