use async_trait::async_trait;
use tracing::debug;

use super::prompts::build_extract_prompt;
use super::{Extractor, LearningBatch, SearchQuery, SourceResult};
use crate::completion::{CompletionError, Field, ObjectSchema, StructuredClient};
use crate::config::{DEFAULT_FOLLOW_UPS_PER_QUERY, DEFAULT_LEARNINGS_PER_QUERY};

/// Extracts learnings and follow-up questions from a query's sources.
pub struct LearningExtractor {
    client: StructuredClient,
    system_prompt: String,
    num_learnings: usize,
    num_follow_ups: usize,
}

impl LearningExtractor {
    pub fn new(client: StructuredClient, system_prompt: impl Into<String>) -> Self {
        Self {
            client,
            system_prompt: system_prompt.into(),
            num_learnings: DEFAULT_LEARNINGS_PER_QUERY,
            num_follow_ups: DEFAULT_FOLLOW_UPS_PER_QUERY,
        }
    }

    pub fn with_limits(mut self, num_learnings: usize, num_follow_ups: usize) -> Self {
        self.num_learnings = num_learnings;
        self.num_follow_ups = num_follow_ups;
        self
    }

    fn schema(&self) -> ObjectSchema {
        ObjectSchema::new("learnings")
            .field(Field::string_list(
                "learnings",
                format!("List of learnings, max of {}", self.num_learnings),
                Some(self.num_learnings),
            ))
            .field(Field::string_list(
                "followUpQuestions",
                format!(
                    "List of follow-up questions to research the topic further, max of {}",
                    self.num_follow_ups
                ),
                Some(self.num_follow_ups),
            ))
    }
}

#[async_trait]
impl Extractor for LearningExtractor {
    async fn extract(
        &self,
        query: &SearchQuery,
        sources: &[SourceResult],
    ) -> Result<LearningBatch, CompletionError> {
        if sources.is_empty() {
            return Ok(LearningBatch::default());
        }

        let prompt = build_extract_prompt(query, sources, self.num_learnings);
        let batch: LearningBatch = self
            .client
            .complete(&self.system_prompt, &prompt, &self.schema())
            .await?;

        debug!(
            query = %query.query,
            learnings = batch.learnings.len(),
            follow_ups = batch.follow_up_questions.len(),
            "Extracted learnings"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMError, LLM};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingLLM {
        calls: AtomicUsize,
        response: String,
    }

    #[async_trait]
    impl LLM for CountingLLM {
        async fn complete(&self, _prompt: &str) -> Result<String, LLMError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }

        async fn complete_with_system(&self, _system: &str, _prompt: &str) -> Result<String, LLMError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    fn query() -> SearchQuery {
        SearchQuery {
            query: "capital of france".into(),
            research_goal: "find it".into(),
        }
    }

    #[tokio::test]
    async fn test_no_sources_skips_model() {
        let llm = Arc::new(CountingLLM {
            calls: AtomicUsize::new(0),
            response: String::new(),
        });
        let extractor = LearningExtractor::new(StructuredClient::new(llm.clone()), "sys");
        let batch = extractor.extract(&query(), &[]).await.unwrap();
        assert_eq!(batch, LearningBatch::default());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_extracts_batch() {
        let llm = Arc::new(CountingLLM {
            calls: AtomicUsize::new(0),
            response: r#"{"learnings":["Paris is the capital of France."],"followUpQuestions":["When did Paris become the capital?"]}"#.into(),
        });
        let extractor = LearningExtractor::new(StructuredClient::new(llm.clone()), "sys").with_limits(2, 2);
        let sources = vec![SourceResult {
            url: "https://en.wikipedia.org/wiki/Paris".into(),
            content: "Paris is the capital and largest city of France.".into(),
        }];
        let batch = extractor.extract(&query(), &sources).await.unwrap();
        assert_eq!(batch.learnings, vec!["Paris is the capital of France."]);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_over_limit_rejected() {
        let llm = Arc::new(CountingLLM {
            calls: AtomicUsize::new(0),
            response: r#"{"learnings":["a","b","c"],"followUpQuestions":[]}"#.into(),
        });
        let extractor = LearningExtractor::new(StructuredClient::new(llm), "sys").with_limits(2, 2);
        let sources = vec![SourceResult {
            url: "u".into(),
            content: "c".into(),
        }];
        let result = extractor.extract(&query(), &sources).await;
        assert!(matches!(result, Err(CompletionError::SchemaViolation(_))));
    }
}
