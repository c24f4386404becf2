//! The port through which a model reaches its tools.

use std::future::Future;

use repolens_types::llm::{ToolCall, ToolDefinition};

/// A fixed set of callable capabilities offered to the model.
///
/// `execute` never fails: a tool's failure is rendered as text and handed
/// back to the model, which decides whether to retry or tell the user.
pub trait ToolExecutor: Send + Sync {
    fn definitions(&self) -> Vec<ToolDefinition>;

    fn execute(&self, call: &ToolCall) -> impl Future<Output = String> + Send;
}
