//! reqwest implementation of the `GitHubTransport` port.

use std::time::Duration;

use repolens_core::github::transport::GitHubTransport;
use repolens_types::error::GitHubError;
use repolens_types::github::HttpReply;

const ACCEPT: &str = "application/vnd.github.v3+json";

/// Plain HTTP GETs against GitHub with the v3 media type.
#[derive(Clone)]
pub struct ReqwestGitHubTransport {
    client: reqwest::Client,
    user_agent: String,
}

impl ReqwestGitHubTransport {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Result<Self, GitHubError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GitHubError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            user_agent: user_agent.into(),
        })
    }
}

impl GitHubTransport for ReqwestGitHubTransport {
    async fn get(&self, url: &str, token: Option<&str>) -> Result<HttpReply, GitHubError> {
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header(reqwest::header::USER_AGENT, &self.user_agent);
        if let Some(token) = token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;

        tracing::debug!(url = %url, status, authed = token.is_some(), "github request");
        Ok(HttpReply { status, body })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> GitHubError {
    if err.is_timeout() {
        GitHubError::Timeout
    } else {
        GitHubError::Transport(err.to_string())
    }
}
