use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{schema_instruction, LLMError, ReasoningConfig, StructuredRequest, LLM};
use crate::config::{
    DEFAULT_ANTHROPIC_API_VERSION, DEFAULT_ANTHROPIC_MODEL, DEFAULT_ANTHROPIC_URL,
    DEFAULT_MAX_TOKENS, MIN_THINKING_BUDGET,
};

/// Claude API client.
///
/// The Messages API has no schema-constrained output mode, so structured
/// completions carry the schema in the prompt. A configured thinking budget
/// is forwarded as an extended-thinking block.
pub struct ClaudeClient {
    api_key: String,
    api_url: String,
    api_version: String,
    model: String,
    max_tokens: u32,
    client: Client,
}

impl ClaudeClient {
    /// Creates a new Claude client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_ANTHROPIC_URL.to_string(),
            api_version: DEFAULT_ANTHROPIC_API_VERSION.to_string(),
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            client: Client::new(),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the maximum tokens for responses.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the API URL (for proxies or enterprise deployments).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Sets the API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    fn build_request(
        &self,
        system: Option<&str>,
        prompt: &str,
        reasoning: Option<&ReasoningConfig>,
    ) -> ClaudeRequest {
        let thinking = reasoning
            .and_then(|r| r.budget_tokens)
            .map(|budget| Thinking {
                thinking_type: "enabled".to_string(),
                budget_tokens: budget.max(MIN_THINKING_BUDGET),
            });

        // max_tokens must leave room for the answer on top of the thinking budget.
        let max_tokens = match &thinking {
            Some(t) if t.budget_tokens >= self.max_tokens => {
                t.budget_tokens.saturating_add(self.max_tokens)
            }
            _ => self.max_tokens,
        };

        ClaudeRequest {
            model: self.model.clone(),
            max_tokens,
            system: system.map(str::to_string),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            thinking,
        }
    }

    async fn send_request(&self, request: &ClaudeRequest) -> Result<String, LLMError> {
        debug!(model = %self.model, "Sending Anthropic message");
        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();

        if status == 429 {
            return Err(LLMError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LLMError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        // Thinking blocks are dropped; only text blocks form the answer.
        let text = claude_response
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(text)
    }
}

#[async_trait]
impl LLM for ClaudeClient {
    async fn complete(&self, prompt: &str) -> Result<String, LLMError> {
        let request = self.build_request(None, prompt, None);
        self.send_request(&request).await
    }

    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, LLMError> {
        let request = self.build_request(Some(system), prompt, None);
        self.send_request(&request).await
    }

    async fn complete_structured(&self, request: StructuredRequest<'_>) -> Result<String, LLMError> {
        let prompt = schema_instruction(request.prompt, request.schema);
        let claude_request = self.build_request(Some(request.system), &prompt, request.reasoning);
        self.send_request(&claude_request).await
    }
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<Thinking>,
}

#[derive(Debug, Serialize)]
struct Thinking {
    #[serde(rename = "type")]
    thinking_type: String,
    budget_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}
