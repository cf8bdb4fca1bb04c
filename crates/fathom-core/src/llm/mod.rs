mod claude;
mod error;
mod openai;
mod provider;

pub use claude::ClaudeClient;
pub use error::LLMError;
pub use openai::OpenAIClient;
pub use provider::Provider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Reasoning effort for OpenAI-style reasoning models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    /// Parses "low" / "medium" / "high" (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Provider-specific reasoning options attached to a completion.
///
/// Each client picks the field it understands and ignores the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasoningConfig {
    /// Used by OpenAI-compatible clients.
    pub effort: Option<ReasoningEffort>,
    /// Thinking budget used by the Anthropic client.
    pub budget_tokens: Option<u32>,
}

/// A completion whose output must match a JSON schema.
#[derive(Debug, Clone, Copy)]
pub struct StructuredRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    /// Short identifier for the schema (`[a-zA-Z0-9_-]`).
    pub schema_name: &'a str,
    pub schema: &'a serde_json::Value,
    pub reasoning: Option<&'a ReasoningConfig>,
}

/// Trait for Large Language Model providers.
///
/// This abstraction allows swapping between different LLM providers
/// without changing the rest of the code.
///
/// # Supported Providers
///
/// - **OpenAI-compatible** (default): OpenAI, OpenRouter, vLLM, Ollama, ...
/// - **Anthropic**: Claude models via the Messages API
///
/// # Example
///
/// ```ignore
/// use fathom_core::llm::{Provider, LLM};
///
/// let llm = Provider::from_config(&config.llm).build()?;
/// let response = llm.complete("Hello!").await?;
/// ```
#[async_trait]
pub trait LLM: Send + Sync {
    /// Complete a prompt and return the response.
    async fn complete(&self, prompt: &str) -> Result<String, LLMError>;

    /// Complete a prompt with a system message.
    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, LLMError>;

    /// Complete a prompt whose answer must be JSON matching `request.schema`.
    ///
    /// Returns the raw model text; validation is the caller's job.
    /// Default implementation embeds the schema in the prompt and ignores
    /// reasoning options.
    async fn complete_structured(&self, request: StructuredRequest<'_>) -> Result<String, LLMError> {
        let prompt = schema_instruction(request.prompt, request.schema);
        self.complete_with_system(request.system, &prompt).await
    }
}

/// Blanket implementation for boxed trait objects.
#[async_trait]
impl LLM for Box<dyn LLM> {
    async fn complete(&self, prompt: &str) -> Result<String, LLMError> {
        (**self).complete(prompt).await
    }

    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, LLMError> {
        (**self).complete_with_system(system, prompt).await
    }

    async fn complete_structured(&self, request: StructuredRequest<'_>) -> Result<String, LLMError> {
        (**self).complete_structured(request).await
    }
}

/// Appends a JSON-only instruction with the schema to a prompt.
pub(crate) fn schema_instruction(prompt: &str, schema: &serde_json::Value) -> String {
    let schema_text = serde_json::to_string_pretty(schema).unwrap_or_default();
    format!(
        "{prompt}\n\nIMPORTANT: Respond with a single JSON object that matches this JSON Schema exactly. \
         Do not add fields, do not wrap it in prose.\n\n{schema_text}"
    )
}
