//! Configuration loading from analyst.toml.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when `backend.api_key` is unset.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Gemini connection settings.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_model")]
    pub model: String,

    /// Gemini API key. Falls back to `GEMINI_API_KEY`.
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: default_base_url(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Conversation loop settings.
#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            search_limit: default_search_limit(),
            system_instruction: default_system_instruction(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding metrics, documents and reports.
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

fn default_model() -> String {
    runtime::DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    runtime::GEMINI_API_URL.to_string()
}

fn default_embedding_model() -> String {
    runtime::DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_dimensions() -> usize {
    runtime::DEFAULT_EMBEDDING_DIMENSIONS
}

fn default_temperature() -> f64 {
    runtime::DEFAULT_TEMPERATURE
}

fn default_timeout_secs() -> u64 {
    runtime::DEFAULT_TIMEOUT.as_secs()
}

fn default_max_turns() -> usize {
    runtime::DEFAULT_MAX_TURNS
}

fn default_search_limit() -> usize {
    runtime::tools::DEFAULT_SEARCH_LIMIT
}

fn default_system_instruction() -> String {
    runtime::DEFAULT_SYSTEM_INSTRUCTION.to_string()
}

fn default_database() -> PathBuf {
    PathBuf::from("analyst.db")
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_turns == 0 {
            return Err(ConfigError::Invalid("agent.max_turns must be at least 1"));
        }
        if self.agent.search_limit == 0 {
            return Err(ConfigError::Invalid("agent.search_limit must be at least 1"));
        }
        if self.backend.embedding_dimensions == 0 {
            return Err(ConfigError::Invalid(
                "backend.embedding_dimensions must be positive",
            ));
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Invalid("backend.timeout_secs must be positive"));
        }
        if self.backend.model.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.model must not be empty"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    /// The API key from config, else from `env` (the value of `GEMINI_API_KEY`).
    pub fn api_key(&self, env: Option<String>) -> Result<String, ConfigError> {
        self.backend
            .api_key
            .clone()
            .or(env)
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(&'static str),

    #[error("API key not configured: set backend.api_key or GEMINI_API_KEY")]
    MissingApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.backend.model, "gemini-2.5-flash-lite");
        assert_eq!(config.backend.embedding_dimensions, 3072);
        assert_eq!(config.backend.temperature, 0.2);
        assert_eq!(config.agent.max_turns, 5);
        assert_eq!(config.agent.search_limit, 3);
        assert_eq!(config.storage.database, PathBuf::from("analyst.db"));
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse(
            r#"
            [backend]
            model = "gemini-2.5-pro"
            embedding_dimensions = 768
            timeout_secs = 15

            [agent]
            max_turns = 8
            system_instruction = "Be brief."

            [storage]
            database = "/tmp/metrics.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.model, "gemini-2.5-pro");
        assert_eq!(config.backend.embedding_dimensions, 768);
        assert_eq!(config.agent.max_turns, 8);
        assert_eq!(config.agent.system_instruction, "Be brief.");
        assert_eq!(config.agent.search_limit, 3);
        assert_eq!(config.storage.database, PathBuf::from("/tmp/metrics.db"));
    }

    #[test]
    fn zero_turns_is_rejected() {
        let err = Config::parse("[agent]\nmax_turns = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::parse("[backend\nmodel =").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn api_key_prefers_config_then_env() {
        let mut config = Config::default();
        assert!(matches!(config.api_key(None), Err(ConfigError::MissingApiKey)));
        assert!(matches!(
            config.api_key(Some("  ".into())),
            Err(ConfigError::MissingApiKey)
        ));
        assert_eq!(config.api_key(Some("from-env".into())).unwrap(), "from-env");

        config.backend.api_key = Some("from-file".into());
        assert_eq!(config.api_key(Some("from-env".into())).unwrap(), "from-file");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load_or_default("/nonexistent/analyst.toml").unwrap();
        assert_eq!(config.agent.max_turns, 5);
    }
}
