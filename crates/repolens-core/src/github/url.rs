//! GitHub URL parsing.

use std::sync::LazyLock;

use regex::Regex;
use repolens_types::github::RepoKey;

/// A string that does not look like `host/owner/repo[.git]`.
///
/// Tools render this as text for the model instead of failing the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid GitHub URL format")]
pub struct InvalidRepoUrl;

static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[:/]([^/\s]+)/([^/\s]+?)(?:\.git)?/?$")
        .expect("github url pattern is valid")
});

/// Resolve a GitHub URL (https, scheme-less or scp-style) into owner/repo.
pub fn parse_repo_url(url: &str) -> Result<RepoKey, InvalidRepoUrl> {
    let captures = PATTERN.captures(url.trim()).ok_or(InvalidRepoUrl)?;
    Ok(RepoKey::new(&captures[1], &captures[2]))
}
