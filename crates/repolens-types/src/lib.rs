//! Shared domain types for repolens.
//!
//! Conversation turns, LLM request/response shapes, GitHub repository keys,
//! configuration and the error enums shared by the core and infra crates.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, thiserror.

pub mod config;
pub mod conversation;
pub mod error;
pub mod github;
pub mod llm;
