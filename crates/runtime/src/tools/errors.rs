use thiserror::Error;

/// Errors that can occur during tool execution.
///
/// These never abort a conversation: the orchestrator renders them into the
/// tool result so the model can adapt its next turn.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("Tool {0} not found")]
    NotFound(String),
    #[error("Invalid arguments for {tool}: {detail}")]
    InvalidArguments { tool: String, detail: String },
    #[error("No relevant documents found.")]
    NoDocuments,
    #[error("Not enough historical data to forecast.")]
    InsufficientHistory,
    #[error("lookup failed: {0}")]
    Store(String),
    #[error("embedding failed: {0}")]
    Embedding(String),
}

impl From<storage::Error> for ToolError {
    fn from(e: storage::Error) -> Self {
        Self::Store(e.to_string())
    }
}
