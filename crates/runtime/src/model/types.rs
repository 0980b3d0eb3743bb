use super::errors::ModelError;
use crate::tools::ToolSpec;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::future::Future;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    Tool,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
    /// Opaque provider token attached to the call; echoed back unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
            signature: None,
        }
    }
}

/// The result the runtime returned from a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success { name: String, output: Value },
    Failure { name: String, error: String },
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: Value) -> Self {
        Self::Success {
            name: name.into(),
            output,
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Failure {
            name: name.into(),
            error: error.into(),
        }
    }

    /// Name of the tool that produced this result.
    pub fn name(&self) -> &str {
        match self {
            Self::Success { name, .. } | Self::Failure { name, .. } => name,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// The observation handed back to the model: the tool output, or `{"error": ...}`.
    pub fn payload(&self) -> Value {
        match self {
            Self::Success { output, .. } => output.clone(),
            Self::Failure { error, .. } => json!({ "error": error }),
        }
    }
}

/// A part of a message, which can be text or a tool interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Part {
    Text(String),
    /// Text carrying an opaque provider token; echoed back unchanged.
    SignedText { text: String, signature: String },
    ToolCall(ToolCall),
    ToolResult(ToolResult),
    /// A provider part the runtime does not interpret, kept verbatim.
    Opaque(Value),
}

/// A message, consisting of a role and one or more parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    /// A user message with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// A tool message carrying one result per call, in call order.
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            role: Role::Tool,
            parts: results.into_iter().map(Part::ToolResult).collect(),
        }
    }

    pub fn from_parts(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// The first text part, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            Part::Text(text) | Part::SignedText { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Extract all tool calls from this message.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::ToolCall(call) => Some(call.clone()),
                _ => None,
            })
            .collect()
    }

    /// Extract all tool results from this message.
    pub fn results(&self) -> Vec<&ToolResult> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::ToolResult(result) => Some(result),
                _ => None,
            })
            .collect()
    }
}

/// Token usage statistics for a completion.
///
/// Counters the provider omits are reported as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub model_id: String,
}

/// Everything needed for a model request.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolSpec],
    pub system: Option<&'a str>,
}

/// The response from a model.
///
/// `message` is `None` when the provider returned no candidate content.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub message: Option<Message>,
    pub usage: Usage,
}

/// Trait for LLM provider backends.
///
/// A backend only moves a conversation over the wire. It never loops,
/// retries or executes tools.
pub trait Backend: Send + Sync {
    /// Identifier of the configured model.
    fn model_id(&self) -> &str;

    fn complete(
        &self,
        request: ModelRequest<'_>,
    ) -> impl Future<Output = Result<ModelResponse, ModelError>> + Send;
}

/// Trait for text embedding providers.
pub trait Embedder: Send + Sync {
    /// Length of every vector returned by [`Embedder::embed`].
    fn dimensions(&self) -> usize;

    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, ModelError>> + Send;
}
