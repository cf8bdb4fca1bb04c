//! Fathom: recursive web research driven by language models.
//!
//! A query is expanded into search queries, each query's results are
//! distilled into learnings, and follow-up questions seed the next, narrower
//! level. The collected learnings feed a short answer or a long-form report.

pub mod budget;
pub mod completion;
pub mod config;
pub mod llm;
pub mod research;
pub mod search;
pub mod service;
pub mod storage;

pub use budget::PromptBudgeter;
pub use completion::{CompletionError, StructuredClient};
pub use config::Config;
pub use research::{
    ReportFormat, ReportRequest, ResearchBudget, ResearchController, ResearchError,
    ResearchProgress, ResearchResult,
};
pub use service::{ResearchMode, ResearchOutcome, ResearchRequest, ResearchService, ServiceError};
pub use storage::{FileReportStore, ReportRecord, ReportStatus, ReportStore};
