use crate::infra::{deserialize_optional_date, AppState};
use crate::runner::run_once;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{NaiveDate, Utc};
use mpi_ranking::error::AppError;
use mpi_ranking::ranking::RunSummary;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RunRequest {
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) calculation_date: Option<NaiveDate>,
}

pub(crate) fn admin_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/runs", post(trigger_run))
        .route("/api/v1/runs/latest", get(latest_run))
        .layer(Extension(state))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Run the job against the configured data directory. The body is optional; without a
/// `calculation_date` the run uses today's UTC date.
pub(crate) async fn trigger_run(
    Extension(state): Extension<AppState>,
    payload: Option<Json<RunRequest>>,
) -> Result<Json<RunSummary>, AppError> {
    let _guard = state.runs.begin()?;
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let calculation_date = request
        .calculation_date
        .unwrap_or_else(|| Utc::now().date_naive());

    info!(%calculation_date, "ranking run requested over HTTP");
    let summary = run_once(
        &state.runs.data_dir,
        &state.runs.policy,
        calculation_date,
        true,
    )
    .await?;

    state.runs.record(summary.clone()).await;
    Ok(Json(summary))
}

pub(crate) async fn latest_run(
    Extension(state): Extension<AppState>,
) -> Result<Json<RunSummary>, AppError> {
    state.runs.latest().await.map(Json).ok_or(AppError::NoRunYet)
}
