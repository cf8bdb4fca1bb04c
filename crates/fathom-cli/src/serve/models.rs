//! API request and response models.
//!
//! Field names follow the JSON the web front-end already speaks
//! (`visitedUrls`, `reportId`).

use serde::{Deserialize, Serialize};

use fathom_core::{ReportFormat, ResearchMode};

/// API defaults differ from the CLI's; callers expect 3 x 3.
pub const API_DEFAULT_DEPTH: u32 = 3;
pub const API_DEFAULT_BREADTH: u32 = 3;

fn default_depth() -> u32 {
    API_DEFAULT_DEPTH
}

fn default_breadth() -> u32 {
    API_DEFAULT_BREADTH
}

/// Body of `POST /api/research`.
#[derive(Debug, Deserialize)]
pub struct ResearchBody {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_depth")]
    pub depth: u32,
    #[serde(default = "default_breadth")]
    pub breadth: u32,
    #[serde(default, rename = "type")]
    pub mode: ResearchMode,
    #[serde(default)]
    pub format: ReportFormat,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResearchResponse {
    Answer(AnswerResponse),
    Report(ReportStartedResponse),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub success: bool,
    pub answer: String,
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStartedResponse {
    pub success: bool,
    pub report_id: String,
    pub message: String,
}

/// Error body for every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
