use thiserror::Error;

/// Errors from repository operations (used by trait definitions in repolens-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),
}

/// Errors from the repository-metadata cache backing store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(String),

    #[error("cache file is corrupt: {0}")]
    Corrupt(String),
}

/// Transport-level failure talking to GitHub (no HTTP status was received).
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("github request failed: {0}")]
    Transport(String),

    #[error("github request timed out")]
    Timeout,
}

/// Errors raised while assembling configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required secret: set the {0} environment variable")]
    MissingSecret(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_missing_secret_names_variable() {
        let err = ConfigError::MissingSecret("OPENAI_API_KEY".to_string());
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
