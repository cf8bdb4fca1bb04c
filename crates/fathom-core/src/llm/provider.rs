use super::{ClaudeClient, LLMError, OpenAIClient, LLM};
use crate::config::{
    LLMConfig, DEFAULT_ANTHROPIC_API_VERSION, DEFAULT_ANTHROPIC_MODEL, DEFAULT_ANTHROPIC_URL,
    DEFAULT_MAX_TOKENS, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_MODEL,
    DEFAULT_OPENAI_URL, DEFAULT_OPENROUTER_URL,
};

/// LLM Provider configuration.
///
/// Built from an already-resolved [`LLMConfig`]; building never reads the
/// environment.
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI-compatible endpoint (default, most universal)
    OpenAI {
        base_url: Option<String>,
        api_key: Option<String>,
        model: Option<String>,
        max_tokens: u32,
    },
    /// OpenRouter (OpenAI-compatible, key required)
    OpenRouter {
        api_key: Option<String>,
        model: Option<String>,
        max_tokens: u32,
    },
    /// Anthropic Claude
    Anthropic {
        api_key: Option<String>,
        model: Option<String>,
        base_url: Option<String>,
        api_version: Option<String>,
        max_tokens: u32,
    },
    /// Local Ollama instance
    Ollama {
        base_url: Option<String>,
        model: String,
        max_tokens: u32,
    },
}

impl Default for Provider {
    fn default() -> Self {
        Provider::OpenAI {
            base_url: None,
            api_key: None,
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl Provider {
    /// Creates a provider from LLMConfig.
    pub fn from_config(config: &LLMConfig) -> Result<Self, LLMError> {
        let provider = match config.provider.as_str() {
            "openai" | "openai-compatible" => Provider::OpenAI {
                base_url: config.base_url.clone(),
                api_key: config.api_key.clone(),
                model: config.model.clone(),
                max_tokens: config.max_tokens,
            },
            "openrouter" => Provider::OpenRouter {
                api_key: config.api_key.clone(),
                model: config.model.clone(),
                max_tokens: config.max_tokens,
            },
            "anthropic" | "claude" => Provider::Anthropic {
                api_key: config.api_key.clone(),
                model: config.model.clone(),
                base_url: config.base_url.clone(),
                api_version: config.api_version.clone(),
                max_tokens: config.max_tokens,
            },
            "ollama" => Provider::Ollama {
                base_url: config.base_url.clone(),
                model: config.model.clone().unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
                max_tokens: config.max_tokens,
            },
            other => return Err(LLMError::UnknownProvider(other.to_string())),
        };
        Ok(provider)
    }

    /// Creates an LLM client from the provider configuration.
    ///
    /// Fails with [`LLMError::MissingApiKey`] when a hosted API is targeted
    /// without credentials.
    pub fn build(self) -> Result<Box<dyn LLM>, LLMError> {
        match self {
            Provider::OpenAI {
                base_url,
                api_key,
                model,
                max_tokens,
            } => {
                let base = base_url.unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
                let key = api_key.filter(|k| !k.is_empty());

                // Self-hosted compatible servers often run without auth.
                if key.is_none() && base.trim_end_matches('/') == DEFAULT_OPENAI_URL {
                    return Err(LLMError::MissingApiKey("openai".to_string()));
                }

                let mdl = model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
                Ok(Box::new(
                    OpenAIClient::new(base, key.unwrap_or_default(), mdl).with_max_tokens(max_tokens),
                ))
            }

            Provider::OpenRouter {
                api_key,
                model,
                max_tokens,
            } => {
                let key = api_key
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| LLMError::MissingApiKey("openrouter".to_string()))?;
                let mdl = model.ok_or_else(|| {
                    LLMError::MissingConfig("llm.model is required for openrouter".to_string())
                })?;
                Ok(Box::new(
                    OpenAIClient::new(DEFAULT_OPENROUTER_URL, key, mdl).with_max_tokens(max_tokens),
                ))
            }

            Provider::Anthropic {
                api_key,
                model,
                base_url,
                api_version,
                max_tokens,
            } => {
                let key = api_key
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| LLMError::MissingApiKey("anthropic".to_string()))?;

                let client = ClaudeClient::new(key)
                    .with_model(model.unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()))
                    .with_api_url(base_url.unwrap_or_else(|| DEFAULT_ANTHROPIC_URL.to_string()))
                    .with_api_version(
                        api_version.unwrap_or_else(|| DEFAULT_ANTHROPIC_API_VERSION.to_string()),
                    )
                    .with_max_tokens(max_tokens);

                Ok(Box::new(client))
            }

            Provider::Ollama {
                base_url,
                model,
                max_tokens,
            } => {
                let base = base_url.unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
                Ok(Box::new(OpenAIClient::new(base, "", model).with_max_tokens(max_tokens)))
            }
        }
    }
}
