//! Recursive web research.
//!
//! A [`ResearchController`] plans sub-queries, retrieves sources for each,
//! extracts learnings, and recurses on follow-up questions with a shrinking
//! budget. The [`Synthesizer`] turns the collected learnings into an answer
//! or a report.

mod controller;
mod extractor;
mod feedback;
mod planner;
pub mod prompts;
mod synthesizer;
mod types;

pub use controller::{ResearchController, ResearchProgress};
pub use extractor::LearningExtractor;
pub use feedback::FeedbackGenerator;
pub use planner::QueryPlanner;
pub use synthesizer::Synthesizer;
pub use types::{
    DedupPolicy, LearningBatch, ReportFormat, ReportRequest, ResearchBudget, ResearchResult,
    SearchQuery,
};

pub use crate::search::SourceResult;

use async_trait::async_trait;
use thiserror::Error;

use crate::budget::BudgetError;
use crate::completion::CompletionError;
use crate::llm::LLMError;
use crate::search::SearchError;

/// Produces the next batch of search queries for a research prompt.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(
        &self,
        query: &str,
        prior_learnings: &[String],
        breadth: usize,
    ) -> Result<Vec<SearchQuery>, CompletionError>;
}

/// Fetches documents for a planned query.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &SearchQuery) -> Result<Vec<SourceResult>, SearchError>;
}

/// Distills retrieved documents into learnings and follow-up questions.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        query: &SearchQuery,
        sources: &[SourceResult],
    ) -> Result<LearningBatch, CompletionError>;
}

/// Errors that abort a research run.
///
/// Failures of individual queries are not errors; they only shrink the result.
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Invalid research budget: {0}")]
    InvalidBudget(String),

    #[error("Model configuration error: {0}")]
    Configuration(#[source] LLMError),

    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] BudgetError),
}
