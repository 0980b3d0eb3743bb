//! Analyst runtime: a Gemini-backed agent that answers business questions
//! by calling reporting tools over a metric store.
//!
//! # Overview
//!
//! - **Backend**: a trait over the model provider. [`GeminiBackend`] speaks
//!   the Gemini REST API and also computes embeddings.
//! - **ToolHost**: the boundary between the model loop and the tools.
//!   [`ToolRegistry`] serves the five reporting tools.
//! - **Orchestrator**: runs the bounded tool-calling loop and returns an
//!   [`Answer`] or a [`RunError`].
//! - **Reply**: maps an outcome to a status and JSON body.
//!
//! # Example
//!
//! ```no_run
//! use runtime::{GeminiBackend, Orchestrator, Reply, ToolRegistry};
//! use std::sync::Arc;
//! use storage::MetricStore;
//!
//! # async fn example() -> runtime::Result<()> {
//! let backend = GeminiBackend::builder("api-key").build()?;
//! let store = Arc::new(MetricStore::open("analyst.db")?);
//! let tools = ToolRegistry::new(store, backend.clone());
//! let orchestrator = Orchestrator::new(backend);
//!
//! let result = orchestrator
//!     .run("Why did EMEA revenue drop in May 2024?", &tools, None)
//!     .await
//!     .map_err(runtime::Error::from);
//! println!("{}", Reply::from_result(&result).to_json());
//! # Ok(())
//! # }
//! ```

pub mod analysis;
mod error;
pub mod model;
mod orchestrator;
mod providers;
mod reply;
pub mod tools;

#[cfg(test)]
mod testing;

pub use analysis::{MonthlyAnalysis, percent_change};
pub use error::{Error, Result, RunError};
pub use model::{
    Backend, Embedder, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolCall,
    ToolResult, Usage,
};
pub use orchestrator::{Answer, DEFAULT_MAX_TURNS, DEFAULT_SYSTEM_INSTRUCTION, Orchestrator};
pub use providers::{
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
    DEFAULT_TIMEOUT, GEMINI_API_URL, GeminiBackend, GeminiBackendBuilder,
};
pub use reply::Reply;
pub use tools::{ToolError, ToolHost, ToolKind, ToolRegistry, ToolSpec};
