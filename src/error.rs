//! Error types and error handling for the application
//!
//! This module defines the application error type returned by HTTP handlers.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use crate::pipeline::events::Stage;
use crate::pipeline::orchestrator::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// The research run was rejected or aborted
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Pipeline(PipelineError::InvalidSubmission(_)) => StatusCode::BAD_REQUEST,
            AppError::Pipeline(PipelineError::Planning(_) | PipelineError::Writing(_)) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn stage(&self) -> Option<Stage> {
        match self {
            AppError::Pipeline(e) => Some(e.stage()),
            AppError::Internal(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let mut body = json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        if let Some(stage) = self.stage() {
            body["stage"] = json!(stage);
        }

        (status, Json(body)).into_response()
    }
}
