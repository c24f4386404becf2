//! Write-through cache for repository metadata.
//!
//! Entries are keyed by [`RepoKey::cache_key`] and never expire. Every `put`
//! rewrites the whole backing store while holding the cache lock, so writes
//! from concurrent requests in one process are serialized. The lock is never
//! held across a GitHub call.

use std::collections::HashMap;
use std::future::Future;

use serde_json::Value;
use tokio::sync::Mutex;

use repolens_types::error::CacheError;
use repolens_types::github::RepoKey;

use super::transport::{GitHubClient, GitHubTransport};

/// Durable backing for the cache: one JSON object, loaded once and
/// rewritten wholesale.
pub trait CacheStore: Send + Sync {
    fn load(&self) -> impl Future<Output = Result<HashMap<String, Value>, CacheError>> + Send;

    fn save(
        &self,
        entries: &HashMap<String, Value>,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;
}

pub struct RepoLookupCache<S> {
    entries: Mutex<HashMap<String, Value>>,
    store: S,
}

impl<S: CacheStore> RepoLookupCache<S> {
    /// Load the backing store. A missing or unreadable store starts empty.
    pub async fn open(store: S) -> Self {
        let entries = match store.load().await {
            Ok(entries) => {
                tracing::debug!(entries = entries.len(), "loaded repository cache");
                entries
            }
            Err(err) => {
                tracing::warn!(error = %err, "repository cache unreadable, starting empty");
                HashMap::new()
            }
        };

        Self {
            entries: Mutex::new(entries),
            store,
        }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Insert and persist. The in-memory entry is kept even if the save fails.
    pub async fn put(&self, key: impl Into<String>, value: Value) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.into(), value);
        self.store.save(&entries).await
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Repository metadata from cache, else from `GET /repos/{owner}/{repo}`.
    ///
    /// The request goes out unauthenticated first; if that fails and a token
    /// is configured it is retried once with the token. `None` means GitHub
    /// could not be reached or refused us, not that the repository is missing.
    pub async fn lookup<T: GitHubTransport>(
        &self,
        client: &GitHubClient<T>,
        repo: &RepoKey,
    ) -> Option<Value> {
        let key = repo.cache_key();
        if let Some(cached) = self.get(&key).await {
            tracing::debug!(repo = %repo, "repository cache hit");
            return Some(cached);
        }

        let url = client.endpoints().repo(repo);
        let mut reply = client.get_anonymous(&url).await;
        let anonymous_ok = matches!(&reply, Ok(r) if r.is_success());

        if !anonymous_ok && client.has_token() {
            tracing::debug!(repo = %repo, "anonymous lookup failed, retrying with token");
            reply = client.get(&url).await;
        }

        let reply = match reply {
            Ok(reply) if reply.is_success() => reply,
            Ok(reply) => {
                tracing::warn!(repo = %repo, status = reply.status, "repository lookup refused");
                return None;
            }
            Err(err) => {
                tracing::warn!(repo = %repo, error = %err, "repository lookup failed");
                return None;
            }
        };

        let data: Value = match serde_json::from_str(&reply.body) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(repo = %repo, error = %err, "repository lookup returned invalid JSON");
                return None;
            }
        };

        if let Err(err) = self.put(key, data.clone()).await {
            tracing::warn!(repo = %repo, error = %err, "failed to persist repository cache");
        }
        Some(data)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::github::transport::GitHubEndpoints;
    use repolens_types::error::GitHubError;
    use repolens_types::github::HttpReply;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    /// In-memory store that counts saves and can be told to fail.
    #[derive(Clone, Default)]
    pub(crate) struct MemoryStore {
        pub(crate) initial: Option<HashMap<String, Value>>,
        pub(crate) corrupt: bool,
        pub(crate) fail_saves: bool,
        pub(crate) saved: Arc<StdMutex<Vec<HashMap<String, Value>>>>,
    }

    impl CacheStore for MemoryStore {
        async fn load(&self) -> Result<HashMap<String, Value>, CacheError> {
            if self.corrupt {
                return Err(CacheError::Corrupt("expected value at line 1".into()));
            }
            Ok(self.initial.clone().unwrap_or_default())
        }

        async fn save(&self, entries: &HashMap<String, Value>) -> Result<(), CacheError> {
            if self.fail_saves {
                return Err(CacheError::Io("read-only filesystem".into()));
            }
            self.saved.lock().unwrap().push(entries.clone());
            Ok(())
        }
    }

    /// Transport answering by URL, recording each request and whether a
    /// token was attached.
    #[derive(Default)]
    pub(crate) struct RoutedTransport {
        pub(crate) routes: StdMutex<Vec<(String, Option<bool>, Result<HttpReply, ()>)>>,
        pub(crate) calls: StdMutex<Vec<(String, bool)>>,
    }

    impl RoutedTransport {
        /// Answer `url` (optionally only for requests with/without token).
        pub(crate) fn route(self, url: &str, authed: Option<bool>, status: u16, body: &str) -> Self {
            self.routes.lock().unwrap().push((
                url.to_string(),
                authed,
                Ok(HttpReply {
                    status,
                    body: body.to_string(),
                }),
            ));
            self
        }

        pub(crate) fn fail(self, url: &str) -> Self {
            self.routes
                .lock()
                .unwrap()
                .push((url.to_string(), None, Err(())));
            self
        }

        pub(crate) fn calls(&self) -> Vec<(String, bool)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl GitHubTransport for RoutedTransport {
        async fn get(&self, url: &str, token: Option<&str>) -> Result<HttpReply, GitHubError> {
            let authed = token.is_some();
            self.calls.lock().unwrap().push((url.to_string(), authed));
            let routes = self.routes.lock().unwrap();
            let hit = routes
                .iter()
                .find(|(u, a, _)| u == url && a.is_none_or(|a| a == authed));
            match hit {
                Some((_, _, Ok(reply))) => Ok(reply.clone()),
                Some((_, _, Err(()))) => Err(GitHubError::Transport("connection reset".into())),
                None => Ok(HttpReply {
                    status: 404,
                    body: "{\"message\":\"Not Found\"}".into(),
                }),
            }
        }
    }

    const REPO_URL: &str = "https://api.github.com/repos/acme/widgets";

    fn client(transport: RoutedTransport, token: Option<&str>) -> GitHubClient<RoutedTransport> {
        GitHubClient::new(transport, GitHubEndpoints::default(), token.map(String::from))
    }

    fn widgets() -> RepoKey {
        RepoKey::new("acme", "widgets")
    }

    #[tokio::test]
    async fn corrupt_store_opens_empty() {
        let cache = RepoLookupCache::open(MemoryStore {
            corrupt: true,
            ..Default::default()
        })
        .await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn put_rewrites_the_whole_store() {
        let store = MemoryStore {
            initial: Some(HashMap::from([("repo_a_b".to_string(), json!(1))])),
            ..Default::default()
        };
        let saved = store.saved.clone();
        let cache = RepoLookupCache::open(store).await;

        cache.put("repo_c_d", json!(2)).await.unwrap();

        let saved = saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].len(), 2);
        assert_eq!(saved[0]["repo_a_b"], json!(1));
        assert_eq!(saved[0]["repo_c_d"], json!(2));
    }

    #[tokio::test]
    async fn failed_save_keeps_entry_in_memory() {
        let cache = RepoLookupCache::open(MemoryStore {
            fail_saves: true,
            ..Default::default()
        })
        .await;
        assert!(cache.put("k", json!("v")).await.is_err());
        assert_eq!(cache.get("k").await, Some(json!("v")));
    }

    #[tokio::test]
    async fn repeated_lookup_hits_network_once() {
        let store = MemoryStore::default();
        let saved = store.saved.clone();
        let cache = RepoLookupCache::open(store).await;
        let client = client(
            RoutedTransport::default().route(REPO_URL, None, 200, r#"{"full_name":"acme/widgets"}"#),
            None,
        );

        let first = cache.lookup(&client, &widgets()).await.unwrap();
        let second = cache.lookup(&client, &widgets()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first["full_name"], "acme/widgets");
        assert_eq!(client.transport().calls().len(), 1);
        assert_eq!(saved.lock().unwrap().len(), 1);
        assert!(saved.lock().unwrap()[0].contains_key("repo_acme_widgets"));
    }

    #[tokio::test]
    async fn preloaded_entry_skips_network() {
        let store = MemoryStore {
            initial: Some(HashMap::from([(
                "repo_acme_widgets".to_string(),
                json!({"full_name": "acme/widgets"}),
            )])),
            ..Default::default()
        };
        let cache = RepoLookupCache::open(store).await;
        let client = client(RoutedTransport::default(), None);

        assert!(cache.lookup(&client, &widgets()).await.is_some());
        assert!(client.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn retries_with_token_after_anonymous_failure() {
        let cache = RepoLookupCache::open(MemoryStore::default()).await;
        let client = client(
            RoutedTransport::default()
                .route(REPO_URL, Some(false), 403, "rate limited")
                .route(REPO_URL, Some(true), 200, r#"{"full_name":"acme/widgets"}"#),
            Some("ghp_secret"),
        );

        assert!(cache.lookup(&client, &widgets()).await.is_some());
        assert_eq!(
            client.transport().calls(),
            vec![(REPO_URL.to_string(), false), (REPO_URL.to_string(), true)]
        );
    }

    #[tokio::test]
    async fn anonymous_failure_without_token_is_absent() {
        let store = MemoryStore::default();
        let saved = store.saved.clone();
        let cache = RepoLookupCache::open(store).await;
        let client = client(RoutedTransport::default().fail(REPO_URL), None);

        assert!(cache.lookup(&client, &widgets()).await.is_none());
        assert_eq!(client.transport().calls().len(), 1);
        assert!(saved.lock().unwrap().is_empty());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_puts_are_all_persisted() {
        let store = MemoryStore::default();
        let saved = store.saved.clone();
        let cache = Arc::new(RepoLookupCache::open(store).await);

        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.put(format!("repo_o_{i}"), json!(i)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let saved = saved.lock().unwrap();
        assert_eq!(saved.len(), 16);
        // Each save sees every earlier insert: sizes grow strictly by one.
        let sizes: Vec<usize> = saved.iter().map(HashMap::len).collect();
        assert_eq!(sizes, (1..=16).collect::<Vec<_>>());
    }
}
