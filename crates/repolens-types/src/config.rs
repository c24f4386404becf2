//! Configuration types for repolens.
//!
//! `AppConfig` mirrors the optional `config.toml` in the data directory.
//! Every field has a default, so an empty file (or no file) is valid.
//! Secrets never live here: model keys, the GitHub token and the API bearer
//! token are read from the environment by the infra config loader.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Number of prior turns loaded into each model call.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Model attempted first, up to `retry.max_retries` times.
    #[serde(default = "default_primary")]
    pub primary: ModelConfig,

    /// Model substituted once when the primary keeps returning empty responses.
    #[serde(default = "default_fallback")]
    pub fallback: Option<ModelConfig>,

    #[serde(default)]
    pub github: GitHubConfig,

    /// SQLite URL for the conversation store. Defaults to `{data_dir}/repolens.db`.
    #[serde(default)]
    pub database_url: Option<String>,
}

fn default_history_limit() -> u32 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            history_limit: default_history_limit(),
            retry: RetryConfig::default(),
            primary: default_primary(),
            fallback: default_fallback(),
            github: GitHubConfig::default(),
            database_url: None,
        }
    }
}

/// HTTP bind address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Bounds for the model-invocation retry loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_attempt_timeout_secs() -> u64 {
    45
}

fn default_backoff_secs() -> u64 {
    2
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

/// Which chat-completions dialect a model endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openrouter")]
    OpenRouter,
    /// Any other OpenAI-compatible endpoint; requires `base_url`.
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::OpenRouter => write!(f, "openrouter"),
            ProviderKind::OpenAiCompatible => write!(f, "openai_compatible"),
        }
    }
}

/// One model endpoint: dialect, model name, optional base URL override and
/// the environment variable holding its API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    pub api_key_env: String,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

fn default_primary() -> ModelConfig {
    ModelConfig {
        provider: ProviderKind::OpenAi,
        model: "gpt-4o-mini".to_string(),
        base_url: None,
        api_key_env: "OPENAI_API_KEY".to_string(),
        max_tokens: None,
        temperature: None,
    }
}

fn default_fallback() -> Option<ModelConfig> {
    Some(ModelConfig {
        provider: ProviderKind::OpenRouter,
        model: "openai/gpt-4o-mini".to_string(),
        base_url: None,
        api_key_env: "OPENROUTER_API_KEY".to_string(),
        max_tokens: None,
        temperature: None,
    })
}

/// GitHub endpoints and the repository-metadata cache location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_raw_base_url")]
    pub raw_base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Defaults to `{data_dir}/github_cache.json`.
    #[serde(default)]
    pub cache_file: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_base_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_user_agent() -> String {
    "repolens".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            raw_base_url: default_raw_base_url(),
            user_agent: default_user_agent(),
            cache_file: None,
        }
    }
}
