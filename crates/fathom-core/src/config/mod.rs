//! Configuration management for Fathom.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `fathom.toml` file
//! 3. User config `~/.config/fathom/config.toml`
//! 4. Built-in defaults (lowest priority)
//!
//! Everything is resolved once, at load time. Components receive the
//! resolved structs and never consult the environment themselves.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

use crate::llm::{ReasoningConfig, ReasoningEffort};
use crate::research::DedupPolicy;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration.
    pub llm: LLMConfig,

    /// Search backend configuration.
    pub search: SearchConfig,

    /// Research controller configuration.
    pub research: ResearchConfig,

    /// Report storage configuration.
    pub storage: StorageConfig,

    /// HTTP API configuration.
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./fathom.toml` (project local)
    /// 2. `~/.config/fathom/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new("fathom.toml").exists() {
            return Self::from_file("fathom.toml");
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("fathom").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using an arbitrary variable lookup.
    ///
    /// Also resolves provider credentials (`OPENAI_API_KEY`,
    /// `ANTHROPIC_API_KEY`, `FIRECRAWL_KEY`, ...) so that the returned
    /// config is self-contained.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // LLM overrides
        if let Some(provider) = lookup("FATHOM_LLM_PROVIDER") {
            self.llm.provider = provider.to_lowercase();
        }
        if let Some(model) = lookup("FATHOM_LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(url) = lookup("FATHOM_LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Some(key) = lookup("FATHOM_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(n) = lookup("FATHOM_LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.llm.max_tokens = n;
        }
        if let Some(n) = lookup("FATHOM_CONTEXT_SIZE").and_then(|v| v.parse().ok()) {
            self.llm.context_size = n;
        }
        if let Some(effort) = lookup("FATHOM_REASONING_EFFORT") {
            self.llm.reasoning_effort = Some(effort);
        }
        if let Some(n) = lookup("FATHOM_THINKING_BUDGET").and_then(|v| v.parse().ok()) {
            self.llm.thinking_budget = Some(n);
        }
        if self.llm.api_key.is_none() {
            let provider_var = match self.llm.provider.as_str() {
                "anthropic" | "claude" => Some("ANTHROPIC_API_KEY"),
                "openrouter" => Some("OPENROUTER_API_KEY"),
                "ollama" => None,
                _ => Some("OPENAI_API_KEY"),
            };
            self.llm.api_key = provider_var.and_then(&lookup);
        }

        // Search overrides
        if let Some(key) = lookup("FATHOM_SEARCH_API_KEY").or_else(|| lookup("FIRECRAWL_KEY")) {
            self.search.api_key = Some(key);
        }
        if let Some(url) = lookup("FATHOM_SEARCH_BASE_URL").or_else(|| lookup("FIRECRAWL_BASE_URL")) {
            self.search.base_url = Some(url);
        }

        // Research overrides
        if let Some(n) = lookup("FATHOM_CONCURRENCY")
            .or_else(|| lookup("FIRECRAWL_CONCURRENCY"))
            .and_then(|v| v.parse().ok())
        {
            self.research.concurrency = n;
        }

        // Storage overrides
        if let Some(dir) = lookup("FATHOM_DATA_DIR") {
            self.storage.data_dir = dir;
        }

        // Server overrides
        if let Some(port) = lookup("FATHOM_PORT")
            .or_else(|| lookup("PORT"))
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }
    }

    /// Checks invariants that the rest of the system relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.research.breadth == 0 {
            return Err(ConfigError::Invalid("research.breadth must be at least 1".into()));
        }
        if self.research.concurrency == 0 {
            return Err(ConfigError::Invalid("research.concurrency must be at least 1".into()));
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::Invalid("search.max_results must be at least 1".into()));
        }
        if self.llm.context_size == 0 {
            return Err(ConfigError::Invalid("llm.context_size must be positive".into()));
        }
        // Every source of one query lands in a single extraction prompt.
        let sources = self
            .search
            .max_results
            .saturating_mul(self.research.content_token_budget);
        if sources >= self.llm.context_size {
            return Err(ConfigError::Invalid(format!(
                "search.max_results * research.content_token_budget ({}) must be below llm.context_size ({})",
                sources, self.llm.context_size
            )));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// Provider name: "openai", "anthropic", "ollama" or "openrouter".
    pub provider: String,

    /// Model name (provider-specific).
    pub model: Option<String>,

    /// Base URL for API (for openai-compatible providers).
    pub base_url: Option<String>,

    /// API key (can also be set via environment variable).
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Maximum tokens for response.
    pub max_tokens: u32,

    /// API version (for Anthropic).
    pub api_version: Option<String>,

    /// Context window used when budgeting prompts.
    pub context_size: usize,

    /// Reasoning effort for OpenAI-style reasoning models ("low", "medium", "high").
    pub reasoning_effort: Option<String>,

    /// Thinking budget in tokens for Anthropic models.
    pub thinking_budget: Option<u32>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_LLM_PROVIDER.to_string(),
            model: None,
            base_url: None,
            api_key: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            api_version: Some(DEFAULT_ANTHROPIC_API_VERSION.to_string()),
            context_size: DEFAULT_CONTEXT_SIZE,
            reasoning_effort: None,
            thinking_budget: None,
        }
    }
}

impl LLMConfig {
    /// Get the model name, falling back to provider defaults.
    pub fn model_or_default(&self) -> String {
        self.model.clone().unwrap_or_else(|| match self.provider.as_str() {
            "anthropic" | "claude" => DEFAULT_ANTHROPIC_MODEL.to_string(),
            "ollama" => DEFAULT_OLLAMA_MODEL.to_string(),
            _ => DEFAULT_OPENAI_MODEL.to_string(),
        })
    }

    /// Get the base URL, falling back to provider defaults.
    pub fn base_url_or_default(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| match self.provider.as_str() {
            "anthropic" | "claude" => DEFAULT_ANTHROPIC_URL.to_string(),
            "ollama" => DEFAULT_OLLAMA_URL.to_string(),
            "openrouter" => DEFAULT_OPENROUTER_URL.to_string(),
            _ => DEFAULT_OPENAI_URL.to_string(),
        })
    }

    /// Provider-specific reasoning options, if any are configured.
    pub fn reasoning(&self) -> Option<ReasoningConfig> {
        let effort = self
            .reasoning_effort
            .as_deref()
            .and_then(ReasoningEffort::parse);
        let budget_tokens = self.thinking_budget.map(|b| b.max(MIN_THINKING_BUDGET));

        if effort.is_none() && budget_tokens.is_none() {
            return None;
        }
        Some(ReasoningConfig {
            effort,
            budget_tokens,
        })
    }
}

/// Search backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Backend name. Only "firecrawl" is supported.
    pub provider: String,

    /// Base URL of the backend (self-hosted deployments).
    pub base_url: Option<String>,

    /// API key for the backend.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Maximum results per query.
    pub max_results: usize,

    /// Per-query timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_SEARCH_PROVIDER.to_string(),
            base_url: None,
            api_key: None,
            max_results: DEFAULT_SEARCH_MAX_RESULTS,
            timeout_secs: DEFAULT_SEARCH_TIMEOUT_SECS,
        }
    }
}

impl SearchConfig {
    /// Get the base URL, falling back to the hosted Firecrawl API.
    pub fn base_url_or_default(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_FIRECRAWL_URL.to_string())
    }

    /// Per-query timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Research controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Default recursion depth.
    pub depth: u32,

    /// Default breadth at the root level.
    pub breadth: u32,

    /// Ceiling on retrieval/extraction calls in flight across the whole tree.
    pub concurrency: usize,

    /// Maximum learnings extracted per query.
    pub learnings_per_query: usize,

    /// Maximum follow-up questions extracted per query.
    pub follow_ups_per_query: usize,

    /// Token budget applied to each retrieved document.
    pub content_token_budget: usize,

    /// Token budget for the learnings block passed to the synthesizer.
    pub report_token_budget: usize,

    /// How learning strings are compared when deduplicating.
    pub dedup: DedupPolicy,

    /// System prompt override. If not set, uses the built-in default.
    pub system_prompt: Option<String>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            breadth: DEFAULT_BREADTH,
            concurrency: DEFAULT_CONCURRENCY,
            learnings_per_query: DEFAULT_LEARNINGS_PER_QUERY,
            follow_ups_per_query: DEFAULT_FOLLOW_UPS_PER_QUERY,
            content_token_budget: DEFAULT_CONTENT_TOKEN_BUDGET,
            report_token_budget: DEFAULT_REPORT_TOKEN_BUDGET,
            dedup: DedupPolicy::default(),
            system_prompt: None,
        }
    }
}

/// Report storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory for fathom data (default: ".fathom").
    pub data_dir: String,

    /// Reports subdirectory name.
    pub reports_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.to_string(),
            reports_dir: DEFAULT_REPORTS_DIR.to_string(),
        }
    }
}

impl StorageConfig {
    /// Get the full path to the reports directory.
    pub fn reports_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.reports_dir)
    }
}

/// HTTP API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,

    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
        }
    }
}
