use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::prompts::{build_plan_prompt, render_learnings};
use super::{Planner, SearchQuery};
use crate::budget::PromptBudgeter;
use crate::completion::{CompletionError, Field, ObjectSchema, StructuredClient};
use crate::config::DEFAULT_CONTENT_TOKEN_BUDGET;

/// Asks the model for up to `breadth` distinct search queries.
pub struct QueryPlanner {
    client: StructuredClient,
    budgeter: PromptBudgeter,
    system_prompt: String,
    learnings_token_budget: usize,
}

impl QueryPlanner {
    pub fn new(client: StructuredClient, budgeter: PromptBudgeter, system_prompt: impl Into<String>) -> Self {
        Self {
            client,
            budgeter,
            system_prompt: system_prompt.into(),
            learnings_token_budget: DEFAULT_CONTENT_TOKEN_BUDGET,
        }
    }

    /// Token budget for the prior-learnings block in the prompt.
    pub fn with_learnings_token_budget(mut self, budget: usize) -> Self {
        self.learnings_token_budget = budget;
        self
    }
}

fn plan_schema(breadth: usize) -> ObjectSchema {
    ObjectSchema::new("search_queries").field(Field::object_list(
        "queries",
        format!("List of web search queries, max of {}", breadth),
        vec![
            Field::string("query", "The search query"),
            Field::string(
                "researchGoal",
                "The goal this query serves, then how to advance the research once results \
                 are in, including further research directions. Be specific.",
            ),
        ],
        Some(breadth),
    ))
}

#[derive(Debug, Deserialize)]
struct PlanResponse {
    queries: Vec<SearchQuery>,
}

/// Drops blank and case-insensitively repeated queries, then caps the count.
fn normalize(queries: Vec<SearchQuery>, breadth: usize) -> Vec<SearchQuery> {
    let mut seen = HashSet::new();
    queries
        .into_iter()
        .filter(|q| !q.query.trim().is_empty())
        .filter(|q| seen.insert(q.query.trim().to_lowercase()))
        .take(breadth)
        .collect()
}

#[async_trait]
impl Planner for QueryPlanner {
    async fn plan(
        &self,
        query: &str,
        prior_learnings: &[String],
        breadth: usize,
    ) -> Result<Vec<SearchQuery>, CompletionError> {
        if breadth == 0 {
            return Ok(Vec::new());
        }

        let learnings_block = if prior_learnings.is_empty() {
            None
        } else {
            Some(
                self.budgeter
                    .trim(&render_learnings(prior_learnings), self.learnings_token_budget),
            )
        };

        let prompt = build_plan_prompt(query, breadth, learnings_block.as_deref());
        let response: PlanResponse = self
            .client
            .complete(&self.system_prompt, &prompt, &plan_schema(breadth))
            .await?;

        let queries = normalize(response.queries, breadth);
        debug!(count = queries.len(), breadth, "Planned queries");
        Ok(queries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(text: &str) -> SearchQuery {
        SearchQuery {
            query: text.to_string(),
            research_goal: "goal".to_string(),
        }
    }

    #[test]
    fn test_normalize_dedupes_case_insensitive() {
        let out = normalize(vec![q("Paris population"), q("paris POPULATION"), q("Lyon")], 5);
        assert_eq!(out, vec![q("Paris population"), q("Lyon")]);
    }

    #[test]
    fn test_normalize_drops_blank_and_truncates() {
        let out = normalize(vec![q("  "), q("a"), q("b"), q("c")], 2);
        assert_eq!(out, vec![q("a"), q("b")]);
    }

    #[test]
    fn test_schema_caps_items() {
        let schema = plan_schema(3).to_json_schema();
        assert_eq!(schema["properties"]["queries"]["maxItems"], 3);
    }
}
