//! Tool host trait.

use crate::model::{ToolCall, ToolResult};
use crate::tools::{ToolError, ToolSpec};
use serde_json::Value;
use std::future::Future;

/// Trait for tool execution hosts.
///
/// Implementations provide tool specifications and execute tool calls.
/// This is the boundary between the model loop and the data the tools read,
/// so the orchestrator never depends on a concrete tool set.
pub trait ToolHost: Send + Sync {
    /// Get available tool specifications.
    fn specs(&self) -> &[ToolSpec];

    /// Execute a tool call.
    fn execute(&self, call: &ToolCall) -> impl Future<Output = Result<Value, ToolError>> + Send;

    /// Execute a tool call and fold any failure into the result.
    fn dispatch(&self, call: &ToolCall) -> impl Future<Output = ToolResult> + Send {
        async move {
            match self.execute(call).await {
                Ok(output) => ToolResult::success(&call.name, output),
                Err(error) => {
                    tracing::warn!(tool = %call.name, error = %error, "tool call failed");
                    ToolResult::failure(&call.name, error.to_string())
                }
            }
        }
    }
}
