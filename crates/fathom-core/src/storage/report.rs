use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a background report.
///
/// Reports move from `Processing` to exactly one of the terminal states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Synthesis is running
    #[default]
    Processing,
    /// Content is available
    Completed,
    /// Synthesis failed; see `error`
    Failed,
}

impl ReportStatus {
    /// Returns true once no further updates are expected.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportStatus::Processing)
    }

    /// Returns a human-readable name for the status.
    pub fn display_name(&self) -> &'static str {
        match self {
            ReportStatus::Processing => "Processing",
            ReportStatus::Completed => "Completed",
            ReportStatus::Failed => "Failed",
        }
    }
}

/// A stored report and its generation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub id: String,
    /// The research query the report answers
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ReportRecord {
    /// Creates a new record in the `Processing` state.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.into(),
            content: None,
            status: ReportStatus::Processing,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Applies the fields set in `update`.
    pub fn apply(&mut self, update: ReportUpdate) {
        if let Some(content) = update.content {
            self.content = Some(content);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(completed_at) = update.completed_at {
            self.completed_at = Some(completed_at);
        }
    }
}

/// Partial update of a [`ReportRecord`]. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportUpdate {
    pub content: Option<String>,
    pub status: Option<ReportStatus>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ReportUpdate {
    /// Marks the report completed with its content.
    pub fn completed(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            status: Some(ReportStatus::Completed),
            completed_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Marks the report failed with a message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(ReportStatus::Failed),
            error: Some(error.into()),
            ..Self::default()
        }
    }
}
