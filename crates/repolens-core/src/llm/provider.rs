//! LlmProvider trait definition.
//!
//! This is the core abstraction that every chat-completion backend implements.
//! Uses RPITIT for `complete`; `BoxLlmProvider` makes it object-safe.

use repolens_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for LLM provider backends (OpenAI, OpenRouter, ...).
///
/// Implementations live in repolens-infra (e.g., `OpenAiCompatibleProvider`).
/// Implementations must report a transport timeout as [`LlmError::Timeout`]
/// and a reply without usable content as [`LlmError::EmptyResponse`]; the
/// retry policy depends on that distinction.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai", "openrouter").
    fn name(&self) -> &str;

    /// Model identifier sent when a request leaves `model` empty.
    fn model(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
