//! Default values for Fathom configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// LLM Defaults
// ============================================================================

/// Default LLM provider.
pub const DEFAULT_LLM_PROVIDER: &str = "openai";

/// Default max tokens for LLM responses.
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Default model context window used for prompt budgeting (in tokens).
pub const DEFAULT_CONTEXT_SIZE: usize = 128_000;

// OpenAI defaults
/// Default OpenAI API URL.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "o3-mini";

// Anthropic defaults
/// Default Anthropic API URL.
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
/// Default Anthropic model.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
/// Default Anthropic API version.
pub const DEFAULT_ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Smallest thinking budget the Anthropic API accepts.
pub const MIN_THINKING_BUDGET: u32 = 1024;

// Ollama defaults
/// Default Ollama API URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/v1";
/// Default Ollama model.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

// OpenRouter defaults
/// Default OpenRouter API URL.
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";

// ============================================================================
// Search Defaults
// ============================================================================

/// Default search backend.
pub const DEFAULT_SEARCH_PROVIDER: &str = "firecrawl";

/// Default Firecrawl API URL.
pub const DEFAULT_FIRECRAWL_URL: &str = "https://api.firecrawl.dev";

/// Results requested per search query.
pub const DEFAULT_SEARCH_MAX_RESULTS: usize = 5;

/// Per-query retrieval timeout in seconds.
pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 15;

// ============================================================================
// Research Defaults
// ============================================================================

/// Default recursion depth.
pub const DEFAULT_DEPTH: u32 = 2;

/// Default breadth at the root level.
pub const DEFAULT_BREADTH: u32 = 4;

/// Default ceiling on retrieval/extraction calls in flight across all levels.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Learnings requested per query.
pub const DEFAULT_LEARNINGS_PER_QUERY: usize = 3;

/// Follow-up questions requested per query.
pub const DEFAULT_FOLLOW_UPS_PER_QUERY: usize = 3;

/// Token budget for a single retrieved document.
pub const DEFAULT_CONTENT_TOKEN_BUDGET: usize = 25_000;

/// Token budget for the learnings block of a final report or answer.
pub const DEFAULT_REPORT_TOKEN_BUDGET: usize = 150_000;

/// Default number of clarification questions.
pub const DEFAULT_FEEDBACK_QUESTIONS: usize = 3;

// ============================================================================
// Storage Defaults
// ============================================================================

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = ".fathom";

/// Default reports subdirectory.
pub const DEFAULT_REPORTS_DIR: &str = "reports";

// ============================================================================
// Server Defaults
// ============================================================================

/// Default API host.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default API port.
pub const DEFAULT_SERVER_PORT: u16 = 3051;
