//! HTTP API layer for repolens.
//!
//! Axum server exposing `POST /api/agent` behind bearer-token
//! authentication, plus liveness and dependency health checks.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
