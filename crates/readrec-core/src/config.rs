//! Configuration for readrec
//!
//! Pipeline defaults and source limits come from [`RecommenderConfig`], which
//! can be loaded from TOML. API keys are kept apart in [`Credentials`] and are
//! read from the environment exactly once, at process start.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding the OpenAI key used for topic inference
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
/// Environment variable holding the optional Semantic Scholar key
pub const SEMANTIC_SCHOLAR_API_KEY_VAR: &str = "SEMANTIC_SCHOLAR_API_KEY";
/// Environment variable holding the Crossref polite-pool contact address
pub const CROSSREF_MAILTO_VAR: &str = "CROSSREF_MAILTO";

/// Why-token lists never grow past this many terms
pub const MAX_EXPLAIN_TOP: usize = 5;

/// System-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Size of the recent-interest window in days
    pub recent_days: u32,
    /// Maximum number of emitted recommendations
    pub limit: usize,
    /// Minimum total visits for a local page to be recommended
    pub min_visits: u32,
    /// Number of why-tokens attached to each item
    pub explain_top: usize,
    /// Number of tokens in a cluster summary
    pub cluster_summary_top: usize,
    /// Number of profile terms handed to topic inference
    pub interest_top: usize,
    /// External literature source limits
    pub sources: SourcesConfig,
    /// Topic inference settings
    pub topics: TopicsConfig,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            recent_days: 14,
            limit: 15,
            min_visits: 1,
            explain_top: MAX_EXPLAIN_TOP,
            cluster_summary_top: 5,
            interest_top: 8,
            sources: SourcesConfig::default(),
            topics: TopicsConfig::default(),
        }
    }
}

/// Limits applied to the external literature sources
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    /// Minimum number of results requested per outbound call
    pub results_per_call: u32,
    /// Total outbound calls per request, shared across enabled sources
    pub max_total_calls: usize,
    /// Calls allowed in flight at the same time
    pub max_in_flight: usize,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// User-Agent sent to every source
    pub user_agent: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            results_per_call: 20,
            max_total_calls: 12,
            max_in_flight: 4,
            timeout_secs: 20,
            user_agent: format!("readrec/{} (local app)", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Topic inference configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TopicsConfig {
    /// Model identifier passed to the Responses API
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
        }
    }
}

impl RecommenderConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Format(e.to_string()))
    }

    /// Load from `path`, or from the default location when it exists,
    /// or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };

        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Self::from_toml(&text)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.explain_top > MAX_EXPLAIN_TOP {
            return Err(ConfigError::OutOfRange(format!(
                "explain_top must be at most {}",
                MAX_EXPLAIN_TOP
            )));
        }
        if self.sources.max_in_flight == 0 {
            return Err(ConfigError::OutOfRange(
                "sources.max_in_flight must be positive".to_string(),
            ));
        }
        if self.sources.max_total_calls == 0 {
            return Err(ConfigError::OutOfRange(
                "sources.max_total_calls must be positive".to_string(),
            ));
        }
        if self.sources.timeout_secs == 0 || self.topics.timeout_secs == 0 {
            return Err(ConfigError::OutOfRange(
                "timeouts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// `<config_dir>/readrec/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("readrec").join("config.toml"))
}

/// API credentials, captured once and passed explicitly to the clients
#[derive(Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub semantic_scholar_api_key: Option<String>,
    pub crossref_mailto: Option<String>,
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Self {
        Self {
            openai_api_key: non_empty_var(OPENAI_API_KEY_VAR),
            semantic_scholar_api_key: non_empty_var(SEMANTIC_SCHOLAR_API_KEY_VAR),
            crossref_mailto: non_empty_var(CROSSREF_MAILTO_VAR),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<set>"))
            .field(
                "semantic_scholar_api_key",
                &self.semantic_scholar_api_key.as_ref().map(|_| "<set>"),
            )
            .field("crossref_mailto", &self.crossref_mailto)
            .finish()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration loading or validation error
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// The file could not be read
    #[error("Could not read {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    /// The file could not be parsed or written
    #[error("Invalid configuration: {0}")]
    Format(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Format(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Format(err.to_string())
    }
}
