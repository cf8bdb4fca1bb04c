//! HTTP route handlers.
//!
//! Handlers are kept thin, delegating to [`ResearchService`](fathom_core::ResearchService).

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use fathom_core::{ReportRecord, ReportStore, ResearchOutcome, ResearchRequest, ServiceError};

use super::models::{
    AnswerResponse, ErrorResponse, ReportStartedResponse, ResearchBody, ResearchResponse,
};
use super::AppState;

/// A failed request, rendered as `{ error, message }`.
pub struct ApiError {
    status: StatusCode,
    error: String,
    message: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: None,
        }
    }

    fn with_message(mut self, message: impl ToString) -> Self {
        self.message = Some(message.to_string());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.error,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// POST `/api/research` - Research a query, then answer or start a report.
pub async fn research(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResearchBody>,
) -> Result<Json<ResearchResponse>, ApiError> {
    let query = match body.query {
        Some(q) if !q.trim().is_empty() => q,
        _ => return Err(ApiError::new(StatusCode::BAD_REQUEST, "Query is required")),
    };

    let request = ResearchRequest {
        query,
        depth: body.depth,
        breadth: body.breadth,
        mode: body.mode,
        format: body.format,
    };

    match state.service.run(request).await {
        Ok(ResearchOutcome::Answer {
            answer,
            learnings,
            visited_urls,
        }) => Ok(Json(ResearchResponse::Answer(AnswerResponse {
            success: true,
            answer,
            learnings,
            visited_urls,
        }))),
        Ok(ResearchOutcome::ReportStarted { report_id }) => {
            Ok(Json(ResearchResponse::Report(ReportStartedResponse {
                success: true,
                report_id,
                message: "Report generation started".to_string(),
            })))
        }
        Err(e) => Err(research_error(e)),
    }
}

fn research_error(e: ServiceError) -> ApiError {
    if e.is_client_error() {
        return ApiError::new(StatusCode::BAD_REQUEST, "Invalid request").with_message(e);
    }
    error!(error = %e, "Research request failed");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "An error occurred during research")
        .with_message(e)
}

/// GET `/api/reports` - All reports, newest first.
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ReportRecord>>, ApiError> {
    state.service.reports().list_reports().map(Json).map_err(|e| {
        error!(error = %e, "Failed to list reports");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch reports").with_message(e)
    })
}

/// GET `/api/reports/{id}` - A single report.
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReportRecord>, ApiError> {
    match state.service.reports().get_report(&id) {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(ApiError::new(StatusCode::NOT_FOUND, "Report not found")),
        Err(e) => {
            error!(id = %id, error = %e, "Failed to fetch report");
            Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch report")
                .with_message(e))
        }
    }
}
