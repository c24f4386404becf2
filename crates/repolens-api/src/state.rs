//! Application state wiring all services together.
//!
//! `AppState` holds the concrete orchestrator used by both the CLI and the
//! REST API. The orchestrator is generic over its store and tool executor;
//! `AppState` pins them to the infra implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};

use repolens_core::agent::orchestrator::Orchestrator;
use repolens_core::agent::policy::RetryPolicy;
use repolens_core::github::cache::RepoLookupCache;
use repolens_core::github::tools::GitHubTools;
use repolens_core::github::transport::{GitHubClient, GitHubEndpoints};
use repolens_core::llm::invoker::ModelInvoker;
use repolens_infra::config::{self, Secrets};
use repolens_infra::github::cache_file::JsonFileCacheStore;
use repolens_infra::github::transport::ReqwestGitHubTransport;
use repolens_infra::llm::create_provider;
use repolens_infra::sqlite::conversation::SqliteConversationStore;
use repolens_infra::sqlite::pool::DatabasePool;
use repolens_types::config::{AppConfig, ModelConfig};

/// Concrete type aliases for the orchestrator generics pinned to infra implementations.
pub type ConcreteTools = GitHubTools<ReqwestGitHubTransport, JsonFileCacheStore>;

pub type ConcreteOrchestrator = Orchestrator<SqliteConversationStore, ConcreteTools>;

const GITHUB_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything resolved before any service is built: paths, file config and
/// environment secrets.
pub struct Bootstrap {
    pub data_dir: PathBuf,
    pub config: AppConfig,
    pub secrets: Secrets,
}

impl Bootstrap {
    pub async fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        config::load_dotenv();
        let data_dir = config::resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let mut app_config = config::load_config(&data_dir, config_path).await;
        config::apply_env_overrides(&mut app_config);
        config::validate(&app_config)?;

        let secrets = Secrets::from_env(&app_config);
        tracing::debug!(data_dir = %data_dir.display(), ?secrets, "configuration loaded");

        Ok(Self {
            data_dir,
            config: app_config,
            secrets,
        })
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub config: Arc<AppConfig>,
    /// SHA-256 of `API_BEARER_TOKEN`; `None` when the token is unset.
    pub api_token_digest: Option<[u8; 32]>,
}

impl AppState {
    /// Connect to the DB, open the cache and build the model invokers.
    ///
    /// Fails fast when the primary model key is missing.
    pub async fn init(bootstrap: Bootstrap) -> anyhow::Result<Self> {
        let Bootstrap {
            data_dir,
            config: app_config,
            mut secrets,
        } = bootstrap;

        let primary_key = secrets.take_primary_key(&app_config)?;
        let primary = build_invoker(&app_config.primary, primary_key)?;

        let fallback = match (&app_config.fallback, secrets.fallback_api_key.take()) {
            (Some(model), Some(key)) => Some(build_invoker(model, key)?),
            (Some(model), None) => {
                tracing::info!(
                    env = %model.api_key_env,
                    "fallback model disabled: API key not set"
                );
                None
            }
            (None, _) => None,
        };

        let db_pool = DatabasePool::new(&config::database_url(&app_config, &data_dir)).await?;
        tracing::info!(data_dir = %data_dir.display(), "conversation store ready");
        let store = SqliteConversationStore::new(db_pool);

        let transport = ReqwestGitHubTransport::new(&app_config.github.user_agent, GITHUB_TIMEOUT)?;
        let github_token = secrets
            .github_token
            .take()
            .map(|t| t.expose_secret().to_string());
        let client = GitHubClient::new(
            transport,
            GitHubEndpoints::from(&app_config.github),
            github_token,
        );
        let cache_path = config::cache_file_path(&app_config, &data_dir);
        let cache = RepoLookupCache::open(JsonFileCacheStore::new(cache_path)).await;
        let tools = GitHubTools::new(client, cache);

        let orchestrator = Orchestrator::new(store, tools, primary)
            .with_fallback(fallback)
            .with_policy(RetryPolicy::from(&app_config.retry))
            .with_history_limit(app_config.history_limit);

        let api_token_digest = secrets
            .api_bearer_token
            .as_ref()
            .map(|token| token_digest(token.expose_secret()));

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(app_config),
            api_token_digest,
        })
    }
}

pub fn build_invoker(
    model: &ModelConfig,
    api_key: secrecy::SecretString,
) -> anyhow::Result<ModelInvoker> {
    let provider = create_provider(model, api_key)?;
    Ok(ModelInvoker::new(provider)
        .with_max_tokens(model.max_tokens)
        .with_temperature(model.temperature))
}

/// SHA-256 digest of a bearer token.
pub fn token_digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}
