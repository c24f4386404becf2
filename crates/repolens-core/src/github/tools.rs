//! The four GitHub capabilities offered to the model.
//!
//! Every capability takes a GitHub URL, resolves it once through
//! [`parse_repo_url`], and returns text. Failures (bad URL, GitHub refusing,
//! network errors) are text as well, so the model can decide what to tell
//! the user. Tree, file and directory requests share one branch fallback:
//! `main` first, then `master`.

use serde::Deserialize;
use serde_json::{Value, json};

use repolens_types::github::{HttpReply, RepoKey};
use repolens_types::llm::{ToolCall, ToolDefinition};

use super::cache::{CacheStore, RepoLookupCache};
use super::transport::{GitHubClient, GitHubTransport};
use super::url::parse_repo_url;
use crate::llm::tool::ToolExecutor;

pub const GET_REPO_INFO: &str = "get_repo_info";
pub const GET_REPO_STRUCTURE: &str = "get_repo_structure";
pub const GET_FILE_CONTENT: &str = "get_file_content";
pub const GET_DIRECTORY_CONTENTS: &str = "get_directory_contents";

/// Branches tried, in order, for tree/content/listing requests.
const BRANCHES: [&str; 2] = ["main", "master"];

/// Path fragments hidden from the structure listing.
const EXCLUDED_PATHS: [&str; 3] = [".git/", "node_modules/", "__pycache__/"];

pub struct GitHubTools<T, S> {
    client: GitHubClient<T>,
    cache: RepoLookupCache<S>,
}

impl<T: GitHubTransport, S: CacheStore> GitHubTools<T, S> {
    pub fn new(client: GitHubClient<T>, cache: RepoLookupCache<S>) -> Self {
        Self { client, cache }
    }

    pub fn client(&self) -> &GitHubClient<T> {
        &self.client
    }

    /// Name, description, size, stars, language and dates of a repository.
    pub async fn repo_info(&self, github_url: &str) -> String {
        let repo = match parse_repo_url(github_url) {
            Ok(repo) => repo,
            Err(err) => return err.to_string(),
        };

        match self.cache.lookup(&self.client, &repo).await {
            Some(data) => render_repo_info(&repo, &data),
            None => format!(
                "I'm unable to access the GitHub repository information at the moment. \
                 This could be due to authentication issues or rate limiting. \
                 You can try viewing the repository directly at: {github_url}"
            ),
        }
    }

    /// Recursive file tree, one marked entry per line.
    pub async fn repo_structure(&self, github_url: &str) -> String {
        let repo = match parse_repo_url(github_url) {
            Ok(repo) => repo,
            Err(err) => return err.to_string(),
        };

        let endpoints = self.client.endpoints();
        let reply = match self
            .fetch_with_branch_fallback(&repo, |branch| endpoints.tree(&repo, branch))
            .await
        {
            Ok(reply) => reply,
            Err(body) => return format!("Failed to get repository structure: {body}"),
        };

        match serde_json::from_str::<TreeListing>(&reply.body) {
            Ok(listing) => render_tree(&listing.tree),
            Err(err) => format!("Failed to get repository structure: unexpected response ({err})"),
        }
    }

    /// Raw text of one file.
    pub async fn file_content(&self, github_url: &str, file_path: &str) -> String {
        let repo = match parse_repo_url(github_url) {
            Ok(repo) => repo,
            Err(err) => return err.to_string(),
        };

        let endpoints = self.client.endpoints();
        match self
            .fetch_with_branch_fallback(&repo, |branch| endpoints.raw(&repo, branch, file_path))
            .await
        {
            Ok(reply) => reply.body,
            Err(body) => format!("Failed to get file content: {body}"),
        }
    }

    /// Entries directly under `dir_path` (the root when empty).
    pub async fn directory_contents(&self, github_url: &str, dir_path: &str) -> String {
        let repo = match parse_repo_url(github_url) {
            Ok(repo) => repo,
            Err(err) => return err.to_string(),
        };

        let endpoints = self.client.endpoints();
        let reply = match self
            .fetch_with_branch_fallback(&repo, |branch| {
                endpoints.contents(&repo, branch, dir_path)
            })
            .await
        {
            Ok(reply) => reply,
            Err(body) => return format!("Failed to get directory contents: {body}"),
        };

        match serde_json::from_str::<Vec<ContentEntry>>(&reply.body) {
            Ok(entries) if entries.is_empty() => format!("{dir_path} is empty"),
            Ok(entries) => entries
                .iter()
                .map(|e| format!("{}{}", marker(e.kind == "dir"), e.name))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(_) => format!("Failed to get directory contents: {dir_path} is not a directory"),
        }
    }

    /// GET the URL for `main`; on failure retry once for `master`.
    ///
    /// On a second failure the last response body (or transport error) is
    /// returned unchanged so the caller can surface GitHub's own message.
    async fn fetch_with_branch_fallback<F>(
        &self,
        repo: &RepoKey,
        url_for: F,
    ) -> Result<HttpReply, String>
    where
        F: Fn(&str) -> String,
    {
        let mut last_failure = String::new();
        for branch in BRANCHES {
            match self.client.get(&url_for(branch)).await {
                Ok(reply) if reply.is_success() => return Ok(reply),
                Ok(reply) => {
                    tracing::debug!(repo = %repo, branch, status = reply.status, "branch request failed");
                    last_failure = reply.body;
                }
                Err(err) => {
                    tracing::debug!(repo = %repo, branch, error = %err, "branch request failed");
                    last_failure = err.to_string();
                }
            }
        }
        Err(last_failure)
    }
}

#[derive(Deserialize)]
struct TreeListing {
    tree: Vec<TreeEntry>,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ContentEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

fn marker(is_dir: bool) -> &'static str {
    if is_dir { "📁 " } else { "📄 " }
}

fn render_tree(entries: &[TreeEntry]) -> String {
    entries
        .iter()
        .filter(|e| !EXCLUDED_PATHS.iter().any(|x| e.path.contains(x)))
        .map(|e| format!("{}{}", marker(e.kind == "tree"), e.path))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_repo_info(repo: &RepoKey, data: &Value) -> String {
    let text = |field: &str, default: &str| {
        data.get(field)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };
    let size_mb = data.get("size").and_then(Value::as_f64).unwrap_or(0.0) / 1024.0;
    let stars = data
        .get("stargazers_count")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    format!(
        "Repository: {}\nDescription: {}\nSize: {size_mb:.1}MB\nStars: {stars}\nLanguage: {}\nCreated: {}\nLast Updated: {}",
        text("full_name", &repo.to_string()),
        text("description", "No description"),
        text("language", "Unknown"),
        text("created_at", "unknown"),
        text("updated_at", "unknown"),
    )
}

#[derive(Deserialize)]
struct ToolArgs {
    github_url: String,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    dir_path: Option<String>,
}

fn url_property() -> Value {
    json!({
        "type": "string",
        "description": "Repository URL, e.g. https://github.com/owner/repo"
    })
}

impl<T: GitHubTransport, S: CacheStore> ToolExecutor for GitHubTools<T, S> {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: GET_REPO_INFO.into(),
                description: "Get repository information: description, size, stars, language and dates.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": { "github_url": url_property() },
                    "required": ["github_url"]
                }),
            },
            ToolDefinition {
                name: GET_REPO_STRUCTURE.into(),
                description: "Get the full directory structure of a repository.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": { "github_url": url_property() },
                    "required": ["github_url"]
                }),
            },
            ToolDefinition {
                name: GET_FILE_CONTENT.into(),
                description: "Read the content of one file in a repository.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "github_url": url_property(),
                        "file_path": {
                            "type": "string",
                            "description": "Path of the file inside the repository"
                        }
                    },
                    "required": ["github_url", "file_path"]
                }),
            },
            ToolDefinition {
                name: GET_DIRECTORY_CONTENTS.into(),
                description: "List the entries of one directory in a repository.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "github_url": url_property(),
                        "dir_path": {
                            "type": "string",
                            "description": "Directory path inside the repository; empty for the root"
                        }
                    },
                    "required": ["github_url"]
                }),
            },
        ]
    }

    async fn execute(&self, call: &ToolCall) -> String {
        let raw = if call.arguments.trim().is_empty() {
            "{}"
        } else {
            call.arguments.as_str()
        };
        let args: ToolArgs = match serde_json::from_str(raw) {
            Ok(args) => args,
            Err(err) => return format!("Invalid arguments for {}: {err}", call.name),
        };

        tracing::info!(tool = %call.name, url = %args.github_url, "running tool");

        match call.name.as_str() {
            GET_REPO_INFO => self.repo_info(&args.github_url).await,
            GET_REPO_STRUCTURE => self.repo_structure(&args.github_url).await,
            GET_FILE_CONTENT => match args.file_path.as_deref() {
                Some(path) if !path.trim().is_empty() => {
                    self.file_content(&args.github_url, path).await
                }
                _ => format!("Invalid arguments for {GET_FILE_CONTENT}: missing file_path"),
            },
            GET_DIRECTORY_CONTENTS => {
                let dir = args.dir_path.unwrap_or_default();
                self.directory_contents(&args.github_url, &dir).await
            }
            other => format!("Unknown tool: {other}"),
        }
    }
}
