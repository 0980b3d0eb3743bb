//! LLM provider adapters.
//!
//! Each provider implements the backend trait for its specific API.

mod gemini;

pub use gemini::{
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
    DEFAULT_TIMEOUT, GEMINI_API_URL, GeminiBackend, GeminiBackendBuilder,
};
