//! CLI error types.

use crate::config::ConfigError;
use thiserror::Error;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No report id starts with the given prefix.
    #[error("no report found matching '{prefix}'")]
    ReportNotFound { prefix: String },

    /// Multiple reports match the given prefix.
    ///
    /// The user should provide a longer prefix to disambiguate.
    #[error("multiple reports match '{prefix}': {matches:?}")]
    AmbiguousReport {
        prefix: String,
        matches: Vec<String>,
    },

    /// A month argument could not be parsed.
    #[error("unrecognized month '{0}'; try 'May 2024' or '2024-05'")]
    InvalidMonth(String),

    /// Configuration is invalid or missing required fields.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred in the runtime layer.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    /// An error occurred in the storage layer.
    #[error(transparent)]
    Storage(#[from] storage::Error),

    /// Output could not be serialized.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl From<runtime::ModelError> for Error {
    fn from(e: runtime::ModelError) -> Self {
        Self::Runtime(e.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
