//! LLM provider implementations.
//!
//! [`create_provider`] builds the right provider from a [`ModelConfig`], and
//! [`test_provider_connection`] sends a minimal request to check a key and
//! endpoint actually work.

pub mod openai_compat;

use secrecy::SecretString;

use repolens_core::llm::box_provider::BoxLlmProvider;
use repolens_types::config::{ModelConfig, ProviderKind};
use repolens_types::llm::{CompletionRequest, LlmError, Message};

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config as oai;

/// Create a [`BoxLlmProvider`] for one configured model endpoint.
///
/// # Errors
///
/// `InvalidRequest` when an `openai_compatible` model has no `base_url`.
pub fn create_provider(config: &ModelConfig, api_key: SecretString) -> Result<BoxLlmProvider, LlmError> {
    let mut oai_config = match config.provider {
        ProviderKind::OpenAi => oai::openai_defaults(api_key, &config.model),
        ProviderKind::OpenRouter => oai::openrouter_defaults(api_key, &config.model),
        ProviderKind::OpenAiCompatible => {
            let base_url = config.base_url.as_deref().ok_or_else(|| {
                LlmError::InvalidRequest("openai_compatible models need a base_url".into())
            })?;
            oai::custom(&config.provider.to_string(), base_url, api_key, &config.model)
        }
    };
    // An explicit base_url overrides the well-known endpoint (proxies, tests).
    if let Some(base_url) = config.base_url.as_deref() {
        oai_config.base_url = base_url.trim_end_matches('/').to_string();
    }

    Ok(BoxLlmProvider::new(OpenAiCompatibleProvider::new(oai_config)?))
}

/// Send a tiny "Hello" request and report whether the provider answered.
pub async fn test_provider_connection(provider: &BoxLlmProvider) -> Result<(), LlmError> {
    let request = CompletionRequest {
        model: String::new(),
        messages: vec![Message::user("Hello")],
        system: None,
        max_tokens: Some(10),
        temperature: Some(0.0),
        tools: Vec::new(),
    };
    provider.complete(&request).await?;
    Ok(())
}
