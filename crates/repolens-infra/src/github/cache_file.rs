//! JSON file backing for `RepoLookupCache`.
//!
//! The whole cache is one JSON object. Saves write a sibling temp file and
//! rename it over the target so a crash never leaves a half-written cache.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde_json::Value;

use repolens_core::github::cache::CacheStore;
use repolens_types::error::CacheError;

#[derive(Debug, Clone)]
pub struct JsonFileCacheStore {
    path: PathBuf,
}

impl JsonFileCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CacheStore for JsonFileCacheStore {
    async fn load(&self) -> Result<HashMap<String, Value>, CacheError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(CacheError::Io(e.to_string())),
        };
        serde_json::from_str(&raw).map_err(|e| CacheError::Corrupt(e.to_string()))
    }

    async fn save(&self, entries: &HashMap<String, Value>) -> Result<(), CacheError> {
        let json =
            serde_json::to_string_pretty(entries).map_err(|e| CacheError::Io(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::Io(e.to_string()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| CacheError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| CacheError::Io(e.to_string()))?;
        Ok(())
    }
}
