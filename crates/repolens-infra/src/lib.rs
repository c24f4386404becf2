//! Infrastructure layer for repolens.
//!
//! Implements the ports defined in `repolens-core`: the SQLite conversation
//! store, the reqwest GitHub transport and JSON cache file, and the
//! OpenAI-compatible model providers. Also owns configuration loading.

pub mod config;
pub mod github;
pub mod llm;
pub mod sqlite;
