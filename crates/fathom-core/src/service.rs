//! High-level entry point tying research, synthesis and report storage
//! together.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::budget::{BudgetError, PromptBudgeter};
use crate::completion::{CompletionError, StructuredClient};
use crate::config::{Config, DEFAULT_BREADTH, DEFAULT_DEPTH};
use crate::llm::{LLMError, Provider, LLM};
use crate::research::{
    prompts, FeedbackGenerator, LearningExtractor, QueryPlanner, ReportFormat, ReportRequest,
    ResearchBudget, ResearchController, ResearchError, ResearchProgress, ResearchResult,
    Synthesizer,
};
use crate::search::{backend_from_config, ContentRetriever, SearchError};
use crate::storage::{FileReportStore, ReportRecord, ReportStore, ReportUpdate, StorageError};

/// What the caller wants back from a research run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchMode {
    /// A short answer, returned inline.
    #[default]
    Answer,
    /// A long-form report, written in the background.
    Report,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchRequest {
    pub query: String,
    pub depth: u32,
    pub breadth: u32,
    pub mode: ResearchMode,
    pub format: ReportFormat,
}

impl ResearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            depth: DEFAULT_DEPTH,
            breadth: DEFAULT_BREADTH,
            mode: ResearchMode::Answer,
            format: ReportFormat::Standard,
        }
    }

    pub fn with_budget(mut self, depth: u32, breadth: u32) -> Self {
        self.depth = depth;
        self.breadth = breadth;
        self
    }

    pub fn report(mut self, format: ReportFormat) -> Self {
        self.mode = ResearchMode::Report;
        self.format = format;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchOutcome {
    Answer {
        answer: String,
        learnings: Vec<String>,
        visited_urls: Vec<String>,
    },
    ReportStarted {
        report_id: String,
    },
}

/// Runs research requests and manages report records.
pub struct ResearchService {
    controller: ResearchController,
    synthesizer: Arc<Synthesizer>,
    feedback: FeedbackGenerator,
    store: Arc<dyn ReportStore>,
}

impl ResearchService {
    pub fn new(
        controller: ResearchController,
        synthesizer: Synthesizer,
        feedback: FeedbackGenerator,
        store: Arc<dyn ReportStore>,
    ) -> Self {
        Self {
            controller,
            synthesizer: Arc::new(synthesizer),
            feedback,
            store,
        }
    }

    /// Builds every component from configuration.
    ///
    /// Fails early on missing credentials or an unknown provider.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let llm: Arc<dyn LLM> = Arc::from(Provider::from_config(&config.llm)?.build()?);
        let budgeter = PromptBudgeter::tiktoken()?;
        let client = StructuredClient::new(llm.clone()).with_reasoning(config.llm.reasoning());
        let system = config
            .research
            .system_prompt
            .clone()
            .unwrap_or_else(prompts::system_prompt);

        let research = &config.research;

        let planner = QueryPlanner::new(client.clone(), budgeter.clone(), system.clone())
            .with_learnings_token_budget(research.content_token_budget);

        let retriever = ContentRetriever::new(backend_from_config(&config.search)?, budgeter.clone())
            .with_max_results(config.search.max_results)
            .with_timeout_secs(config.search.timeout_secs)
            .with_content_token_budget(research.content_token_budget);

        let extractor = LearningExtractor::new(client.clone(), system.clone())
            .with_limits(research.learnings_per_query, research.follow_ups_per_query);

        let controller = ResearchController::new(
            Arc::new(planner),
            Arc::new(retriever),
            Arc::new(extractor),
        )
        .with_dedup(research.dedup)
        .with_concurrency(research.concurrency);

        let synthesizer = Synthesizer::new(llm, budgeter, system.clone())
            .with_token_budget(research.report_token_budget.min(config.llm.context_size));

        let feedback = FeedbackGenerator::new(client, system);
        let store = Arc::new(FileReportStore::with_config(&config.storage));

        info!(
            provider = %config.llm.provider,
            model = %config.llm.model_or_default(),
            search = %config.search.provider,
            "Research service ready"
        );

        Ok(Self::new(controller, synthesizer, feedback, store))
    }

    /// Routes controller progress events to `sender`.
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<ResearchProgress>) -> Self {
        self.controller = self.controller.with_progress(sender);
        self
    }

    pub fn reports(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }

    /// Runs the research loop only.
    pub async fn research(&self, request: &ResearchRequest) -> Result<ResearchResult, ServiceError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(ServiceError::InvalidRequest("query is required".to_string()));
        }
        let budget = ResearchBudget::new(request.depth, request.breadth)?;
        Ok(self.controller.research(query, budget, ResearchResult::new()).await?)
    }

    /// Researches and then answers inline or starts a background report.
    pub async fn run(&self, request: ResearchRequest) -> Result<ResearchOutcome, ServiceError> {
        let result = self.research(&request).await?;

        match request.mode {
            ResearchMode::Answer => {
                let answer = self
                    .synthesizer
                    .write_answer(request.query.trim(), &result.learnings)
                    .await?;
                Ok(ResearchOutcome::Answer {
                    answer,
                    learnings: result.learnings,
                    visited_urls: result.visited_urls,
                })
            }
            ResearchMode::Report => {
                let (report_id, _handle) = self.start_report(ReportRequest {
                    prompt: request.query.trim().to_string(),
                    learnings: result.learnings,
                    visited_urls: result.visited_urls,
                    format: request.format,
                })?;
                Ok(ResearchOutcome::ReportStarted { report_id })
            }
        }
    }

    /// Creates a `processing` record and writes the report in the background.
    ///
    /// The record ends up `completed` with content, or `failed` with the error.
    pub fn start_report(&self, request: ReportRequest) -> Result<(String, JoinHandle<()>), ServiceError> {
        let record = ReportRecord::new(request.prompt.clone());
        self.store.create_report(&record)?;

        let id = record.id.clone();
        let synthesizer = Arc::clone(&self.synthesizer);
        let store = Arc::clone(&self.store);

        info!(id = %id, format = %request.format, "Report generation started");

        let handle = tokio::spawn({
            let id = id.clone();
            async move {
                let update = match synthesizer.write_report(&request).await {
                    Ok(content) => ReportUpdate::completed(content),
                    Err(e) => {
                        error!(id = %id, error = %e, "Report generation failed");
                        ReportUpdate::failed(e.to_string())
                    }
                };
                if let Err(e) = store.update_report(&id, update) {
                    error!(id = %id, error = %e, "Failed to store report");
                }
            }
        });

        Ok((id, handle))
    }

    /// Writes a report inline.
    pub async fn write_report(&self, request: &ReportRequest) -> Result<String, ServiceError> {
        Ok(self.synthesizer.write_report(request).await?)
    }

    /// Clarifying questions for a query.
    pub async fn feedback(&self, query: &str, num_questions: usize) -> Result<Vec<String>, ServiceError> {
        Ok(self.feedback.generate(query, num_questions).await?)
    }
}

/// Errors that can occur in service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Research(#[from] ResearchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("LLM error: {0}")]
    Llm(#[from] LLMError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Budget(#[from] BudgetError),
}

impl ServiceError {
    /// True when the caller sent something unusable.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::InvalidRequest(_) | ServiceError::Research(ResearchError::InvalidBudget(_))
        )
    }
}
