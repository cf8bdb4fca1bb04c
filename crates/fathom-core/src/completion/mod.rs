//! Schema-checked model completions.

mod schema;

pub use schema::{Field, FieldType, ObjectSchema};

use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::llm::{LLMError, ReasoningConfig, StructuredRequest, LLM};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("LLM error: {0}")]
    Llm(#[from] LLMError),

    #[error("Response does not match schema: {0}")]
    SchemaViolation(String),
}

impl CompletionError {
    /// Fatal errors mean no further model call can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CompletionError::Llm(e) if e.is_configuration())
    }

    /// Keeps a recoverable error, or hands back the model error when it is
    /// fatal.
    pub fn recoverable(self) -> Result<Self, LLMError> {
        if !self.is_fatal() {
            return Ok(self);
        }
        match self {
            CompletionError::Llm(e) => Err(e),
            other => Ok(other),
        }
    }
}

/// Issues one model call per request and returns a typed value that
/// matched the declared schema.
#[derive(Clone)]
pub struct StructuredClient {
    llm: Arc<dyn LLM>,
    reasoning: Option<ReasoningConfig>,
}

impl StructuredClient {
    pub fn new(llm: Arc<dyn LLM>) -> Self {
        Self { llm, reasoning: None }
    }

    pub fn with_reasoning(mut self, reasoning: Option<ReasoningConfig>) -> Self {
        self.reasoning = reasoning;
        self
    }

    /// The underlying model, for free-form completions.
    pub fn llm(&self) -> &Arc<dyn LLM> {
        &self.llm
    }

    pub async fn complete<T: DeserializeOwned>(
        &self,
        system: &str,
        prompt: &str,
        schema: &ObjectSchema,
    ) -> Result<T, CompletionError> {
        let json_schema = schema.to_json_schema();
        let raw = self
            .llm
            .complete_structured(StructuredRequest {
                system,
                prompt,
                schema_name: &schema.name,
                schema: &json_schema,
                reasoning: self.reasoning.as_ref(),
            })
            .await?;

        let json_str = extract_json(&raw);
        let value: serde_json::Value = serde_json::from_str(json_str).map_err(|e| {
            debug!(schema = %schema.name, error = %e, "Unparseable structured response");
            CompletionError::SchemaViolation(format!(
                "invalid JSON: {}. Response: {}",
                e,
                crate::budget::take_chars(json_str, 200)
            ))
        })?;

        schema.validate(&value)?;

        serde_json::from_value(value).map_err(|e| CompletionError::SchemaViolation(e.to_string()))
    }
}

impl std::fmt::Debug for StructuredClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredClient")
            .field("reasoning", &self.reasoning)
            .finish_non_exhaustive()
    }
}

/// Extracts JSON from a response that might be wrapped in markdown code blocks.
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    // ```json ... ``` or ``` ... ```
    if trimmed.starts_with("```") {
        if let Some(start) = trimmed.find('\n') {
            let rest = &trimmed[start + 1..];
            if let Some(end) = rest.rfind("```") {
                return rest[..end].trim();
            }
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;

    struct FixedLLM(String);

    #[async_trait]
    impl LLM for FixedLLM {
        async fn complete(&self, _prompt: &str) -> Result<String, LLMError> {
            Ok(self.0.clone())
        }

        async fn complete_with_system(&self, _system: &str, _prompt: &str) -> Result<String, LLMError> {
            Ok(self.0.clone())
        }
    }

    struct FailingLLM;

    #[async_trait]
    impl LLM for FailingLLM {
        async fn complete(&self, _prompt: &str) -> Result<String, LLMError> {
            Err(LLMError::MissingApiKey("openai".into()))
        }

        async fn complete_with_system(&self, _system: &str, _prompt: &str) -> Result<String, LLMError> {
            Err(LLMError::MissingApiKey("openai".into()))
        }
    }

    #[derive(Debug, Deserialize)]
    struct Feedback {
        questions: Vec<String>,
    }

    fn schema() -> ObjectSchema {
        ObjectSchema::new("feedback").field(Field::string_list("questions", "Questions", Some(2)))
    }

    fn client(response: &str) -> StructuredClient {
        StructuredClient::new(Arc::new(FixedLLM(response.to_string())))
    }

    #[test]
    fn test_extract_json_plain() {
        assert_eq!(extract_json(r#"{"key": "value"}"#), r#"{"key": "value"}"#);
    }

    #[test]
    fn test_extract_json_code_block() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(extract_json(input), r#"{"key": "value"}"#);
    }

    #[tokio::test]
    async fn test_typed_value() {
        let out: Feedback = client(r#"{"questions": ["Which era?", "Which region?"]}"#)
            .complete("sys", "ask", &schema())
            .await
            .unwrap();
        assert_eq!(out.questions, vec!["Which era?", "Which region?"]);
    }

    #[tokio::test]
    async fn test_fenced_response() {
        let out: Feedback = client("```json\n{\"questions\": []}\n```")
            .complete("sys", "ask", &schema())
            .await
            .unwrap();
        assert!(out.questions.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_is_violation() {
        let result: Result<Feedback, _> = client("Sure! Here are some questions.")
            .complete("sys", "ask", &schema())
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, CompletionError::SchemaViolation(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_too_many_items_is_violation() {
        let result: Result<Feedback, _> = client(r#"{"questions": ["a", "b", "c"]}"#)
            .complete("sys", "ask", &schema())
            .await;
        assert!(matches!(result, Err(CompletionError::SchemaViolation(_))));
    }

    #[tokio::test]
    async fn test_missing_key_is_fatal() {
        let client = StructuredClient::new(Arc::new(FailingLLM));
        let result: Result<Feedback, _> = client.complete("sys", "ask", &schema()).await;
        assert!(result.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn test_recoverable_splits_fatal_errors() {
        let client = StructuredClient::new(Arc::new(FailingLLM));
        let result: Result<Feedback, _> = client.complete("sys", "ask", &schema()).await;
        assert!(result.unwrap_err().recoverable().is_err());

        let violation = CompletionError::SchemaViolation("bad".into());
        assert!(matches!(
            violation.recoverable(),
            Ok(CompletionError::SchemaViolation(_))
        ));
        let rate_limited = CompletionError::Llm(LLMError::RateLimited);
        assert!(rate_limited.recoverable().is_ok());
    }
}
