//! HTTP port for GitHub plus endpoint and credential handling.
//!
//! The transport only moves bytes; [`GitHubClient`] decides which URL to hit
//! and whether the configured token is attached.

use std::future::Future;

use repolens_types::config::GitHubConfig;
use repolens_types::error::GitHubError;
use repolens_types::github::{HttpReply, RepoKey};

/// Issues GET requests against GitHub hosts.
///
/// Non-2xx statuses are returned as an [`HttpReply`], not an error; only
/// failures where no status was received are `Err`.
pub trait GitHubTransport: Send + Sync {
    /// GET `url`, adding `Authorization: token <token>` when `token` is set.
    fn get(
        &self,
        url: &str,
        token: Option<&str>,
    ) -> impl Future<Output = Result<HttpReply, GitHubError>> + Send;
}

/// Base URLs for the REST API and the raw-content host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubEndpoints {
    pub api_base_url: String,
    pub raw_base_url: String,
}

impl Default for GitHubEndpoints {
    fn default() -> Self {
        Self::from(&GitHubConfig::default())
    }
}

impl From<&GitHubConfig> for GitHubEndpoints {
    fn from(config: &GitHubConfig) -> Self {
        Self {
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            raw_base_url: config.raw_base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl GitHubEndpoints {
    pub fn repo(&self, key: &RepoKey) -> String {
        format!("{}/repos/{}/{}", self.api_base_url, key.owner, key.repo)
    }

    pub fn tree(&self, key: &RepoKey, branch: &str) -> String {
        format!(
            "{}/repos/{}/{}/git/trees/{branch}?recursive=1",
            self.api_base_url, key.owner, key.repo
        )
    }

    pub fn contents(&self, key: &RepoKey, branch: &str, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}?ref={branch}",
            self.api_base_url,
            key.owner,
            key.repo,
            path.trim_matches('/')
        )
    }

    pub fn raw(&self, key: &RepoKey, branch: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/{branch}/{}",
            self.raw_base_url,
            key.owner,
            key.repo,
            path.trim_start_matches('/')
        )
    }
}

/// A transport bound to endpoints and an optional GitHub token.
pub struct GitHubClient<T> {
    transport: T,
    endpoints: GitHubEndpoints,
    token: Option<String>,
}

impl<T: GitHubTransport> GitHubClient<T> {
    pub fn new(transport: T, endpoints: GitHubEndpoints, token: Option<String>) -> Self {
        Self {
            transport,
            endpoints,
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn endpoints(&self) -> &GitHubEndpoints {
        &self.endpoints
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// GET without credentials.
    pub async fn get_anonymous(&self, url: &str) -> Result<HttpReply, GitHubError> {
        self.transport.get(url, None).await
    }

    /// GET with the configured token attached, if any.
    pub async fn get(&self, url: &str) -> Result<HttpReply, GitHubError> {
        self.transport.get(url, self.token.as_deref()).await
    }
}

impl<T> std::fmt::Debug for GitHubClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("endpoints", &self.endpoints)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
