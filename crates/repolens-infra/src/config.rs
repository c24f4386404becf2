//! Configuration loader for repolens.
//!
//! Reads `config.toml` from the data directory (`~/.repolens/` by default) or
//! an explicit path and deserializes it into [`AppConfig`], falling back to
//! defaults when the file is missing or malformed. Secrets are never read
//! from the file: they come from the environment (optionally seeded from a
//! `.env` file) and are held as [`SecretString`].

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use repolens_types::config::{AppConfig, ProviderKind};
use repolens_types::error::ConfigError;

use crate::sqlite::pool::default_database_url;

pub const DATA_DIR_ENV: &str = "REPOLENS_DATA_DIR";
pub const API_BEARER_TOKEN_ENV: &str = "API_BEARER_TOKEN";
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Load `.env` from the working directory (or a parent) into the process
/// environment. Existing variables win.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("loaded environment from {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!("failed to read .env: {err}"),
    }
}

/// `REPOLENS_DATA_DIR`, else `~/.repolens`, else `./.repolens`.
pub fn resolve_data_dir() -> PathBuf {
    match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".repolens"),
    }
}

/// Load configuration from `explicit` or `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`AppConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_config(data_dir: &Path, explicit: Option<&Path>) -> AppConfig {
    let config_path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join("config.toml"));

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if explicit.is_some() {
                tracing::warn!("config file {} not found, using defaults", config_path.display());
            } else {
                tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            }
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", config_path.display());
            AppConfig::default()
        }
    }
}

/// Apply `HOST` / `PORT` from the environment.
pub fn apply_env_overrides(config: &mut AppConfig) {
    apply_overrides_from(config, |name| std::env::var(name).ok());
}

fn apply_overrides_from(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("HOST").filter(|h| !h.trim().is_empty()) {
        config.server.host = host;
    }
    if let Some(port) = lookup("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(err) => tracing::warn!(value = %port, "ignoring invalid PORT: {err}"),
        }
    }
}

/// Reject configurations that cannot work regardless of environment.
pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.retry.attempt_timeout_secs == 0 {
        return Err(ConfigError::Invalid("retry.attempt_timeout_secs must be positive".into()));
    }
    let models = std::iter::once(("primary", &config.primary))
        .chain(config.fallback.as_ref().map(|m| ("fallback", m)));
    for (section, model) in models {
        if model.model.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{section}.model must not be empty")));
        }
        if model.provider == ProviderKind::OpenAiCompatible && model.base_url.is_none() {
            return Err(ConfigError::Invalid(format!(
                "{section}.base_url is required for openai_compatible"
            )));
        }
    }
    Ok(())
}

/// `{data_dir}/github_cache.json` unless configured.
pub fn cache_file_path(config: &AppConfig, data_dir: &Path) -> PathBuf {
    config
        .github
        .cache_file
        .clone()
        .unwrap_or_else(|| data_dir.join("github_cache.json"))
}

/// `{data_dir}/repolens.db` unless configured.
pub fn database_url(config: &AppConfig, data_dir: &Path) -> String {
    config
        .database_url
        .clone()
        .unwrap_or_else(|| default_database_url(data_dir))
}

/// Secrets pulled from the environment. Blank values count as absent.
pub struct Secrets {
    pub api_bearer_token: Option<SecretString>,
    pub github_token: Option<SecretString>,
    pub primary_api_key: Option<SecretString>,
    pub fallback_api_key: Option<SecretString>,
}

impl Secrets {
    pub fn from_env(config: &AppConfig) -> Self {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    fn from_lookup(config: &AppConfig, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secret = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(SecretString::from)
        };
        Self {
            api_bearer_token: secret(API_BEARER_TOKEN_ENV),
            github_token: secret(GITHUB_TOKEN_ENV),
            primary_api_key: secret(&config.primary.api_key_env),
            fallback_api_key: config
                .fallback
                .as_ref()
                .and_then(|f| secret(&f.api_key_env)),
        }
    }

    /// Take the primary model key, failing if it is not set.
    pub fn take_primary_key(&mut self, config: &AppConfig) -> Result<SecretString, ConfigError> {
        self.primary_api_key
            .take()
            .ok_or_else(|| ConfigError::MissingSecret(config.primary.api_key_env.clone()))
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let present = |s: &Option<SecretString>| if s.is_some() { "[set]" } else { "[unset]" };
        f.debug_struct("Secrets")
            .field("api_bearer_token", &present(&self.api_bearer_token))
            .field("github_token", &present(&self.github_token))
            .field("primary_api_key", &present(&self.primary_api_key))
            .field("fallback_api_key", &present(&self.fallback_api_key))
            .finish()
    }
}
