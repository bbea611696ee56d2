use crate::config::ConfigError;
use crate::ranking::{ImportError, JobError};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("data directory error: {0}")]
    Import(#[from] ImportError),
    #[error("ranking run failed: {0}")]
    Job(#[from] JobError),
    #[error("failed to encode JSON output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("a ranking run is already in progress")]
    RunInProgress,
    #[error("no ranking run has completed yet")]
    NoRunYet,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::RunInProgress => StatusCode::CONFLICT,
            AppError::NoRunYet => StatusCode::NOT_FOUND,
            AppError::Import(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Job(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Json(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
