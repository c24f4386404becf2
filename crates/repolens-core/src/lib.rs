//! Orchestration logic and port traits for repolens.
//!
//! This crate defines the "ports" (provider, store, transport and cache
//! traits) that the infrastructure layer implements, plus the request
//! orchestrator built on top of them. It depends only on `repolens-types`,
//! never on `repolens-infra` or any database/HTTP crate.

pub mod agent;
pub mod conversation;
pub mod github;
pub mod llm;
