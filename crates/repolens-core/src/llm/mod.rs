//! LLM provider abstractions.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: object-safe wrapper for dynamic dispatch
//! - `ToolExecutor`: the port through which the model reaches tools
//! - `ModelInvoker`: one provider plus the tool-calling loop

pub mod box_provider;
pub mod invoker;
pub mod provider;
pub mod tool;
