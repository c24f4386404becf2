//! The request orchestrator and its model-invocation retry policy.

pub mod orchestrator;
pub mod policy;
pub mod prompt;
