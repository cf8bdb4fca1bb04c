use serde::Deserialize;

use super::prompts::build_feedback_prompt;
use crate::completion::{CompletionError, Field, ObjectSchema, StructuredClient};

/// Asks clarifying questions before research starts.
pub struct FeedbackGenerator {
    client: StructuredClient,
    system_prompt: String,
}

#[derive(Debug, Deserialize)]
struct FeedbackResponse {
    questions: Vec<String>,
}

impl FeedbackGenerator {
    pub fn new(client: StructuredClient, system_prompt: impl Into<String>) -> Self {
        Self {
            client,
            system_prompt: system_prompt.into(),
        }
    }

    /// Up to `num_questions` questions; fewer when the query is already clear.
    pub async fn generate(&self, query: &str, num_questions: usize) -> Result<Vec<String>, CompletionError> {
        if num_questions == 0 {
            return Ok(Vec::new());
        }

        let schema = ObjectSchema::new("feedback").field(Field::string_list(
            "questions",
            format!(
                "Follow-up questions to clarify the research direction, max of {}",
                num_questions
            ),
            Some(num_questions),
        ));

        let response: FeedbackResponse = self
            .client
            .complete(&self.system_prompt, &build_feedback_prompt(query, num_questions), &schema)
            .await?;

        Ok(response
            .questions
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect())
    }
}
