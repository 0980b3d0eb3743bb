use crate::model::ModelError;
use thiserror::Error;

/// Terminal outcomes of a conversation that produced no answer.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("model gateway failed: {0}")]
    Gateway(#[from] ModelError),

    #[error("model returned no content")]
    EmptyResponse,

    #[error("model returned an empty answer")]
    EmptyAnswer,

    #[error("model still requested tools after {limit} turns")]
    TooManyToolSteps { limit: usize },
}

impl RunError {
    /// Short machine-readable code for replies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Gateway(_) => "gateway_error",
            Self::EmptyResponse => "empty_response",
            Self::EmptyAnswer => "empty_answer",
            Self::TooManyToolSteps { .. } => "too_many_tool_steps",
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Storage(#[from] storage::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
