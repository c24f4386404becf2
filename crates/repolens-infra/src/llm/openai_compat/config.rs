//! Configuration and per-provider defaults for OpenAI-compatible endpoints.

use secrecy::SecretString;

/// Everything needed to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Provider name used in logs and turn metadata (e.g. "openai").
    pub provider_name: String,
    /// Base URL up to and including the API version, without a trailing slash.
    pub base_url: String,
    pub api_key: SecretString,
    pub model: String,
    /// Extra headers sent with every request.
    pub extra_headers: Vec<(String, String)>,
}

/// OpenAI at `https://api.openai.com/v1`.
pub fn openai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: "https://api.openai.com/v1".into(),
        api_key,
        model: model.into(),
        extra_headers: Vec::new(),
    }
}

/// OpenRouter at `https://openrouter.ai/api/v1`, with its attribution headers.
pub fn openrouter_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openrouter".into(),
        base_url: "https://openrouter.ai/api/v1".into(),
        api_key,
        model: model.into(),
        extra_headers: vec![
            ("HTTP-Referer".into(), "https://github.com/repolens/repolens".into()),
            ("X-Title".into(), "repolens".into()),
        ],
    }
}

/// Any other endpoint speaking the OpenAI chat completions protocol.
pub fn custom(
    provider_name: &str,
    base_url: &str,
    api_key: SecretString,
    model: &str,
) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: provider_name.into(),
        base_url: base_url.trim_end_matches('/').into(),
        api_key,
        model: model.into(),
        extra_headers: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SecretString {
        SecretString::from("sk-test".to_string())
    }

    #[test]
    fn test_openai_defaults() {
        let config = openai_defaults(key(), "gpt-4o-mini");
        assert_eq!(config.provider_name, "openai");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(config.extra_headers.is_empty());
    }

    #[test]
    fn test_openrouter_sends_attribution_headers() {
        let config = openrouter_defaults(key(), "openai/gpt-4o-mini");
        assert_eq!(config.base_url, "https://openrouter.ai/api/v1");
        let names: Vec<&str> = config.extra_headers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["HTTP-Referer", "X-Title"]);
    }

    #[test]
    fn test_custom_trims_trailing_slash() {
        let config = custom("local", "http://localhost:11434/v1/", key(), "llama3");
        assert_eq!(config.base_url, "http://localhost:11434/v1");
    }
}
