//! LLM protocol types and backend traits.

pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::{
    Backend, Embedder, Message, ModelRequest, ModelResponse, Part, Role, ToolCall, ToolResult,
    Usage,
};
