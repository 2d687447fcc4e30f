use crate::infra::AppState;
use audit_report::error::AppError;
use audit_report::workflows::audit::ReportOutcome;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateReportRequest {
    pub(crate) document_id: String,
    #[serde(default)]
    pub(crate) persist: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateReportResponse {
    #[serde(flatten)]
    pub(crate) outcome: ReportOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) artifact: Option<String>,
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/reports", post(generate_report_endpoint))
        .route(
            "/api/v1/reports/:document_id/html",
            get(report_html_endpoint),
        )
        .layer(Extension(state))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed) && state.reports.is_ready();
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

pub(crate) async fn generate_report_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<GenerateReportRequest>,
) -> Result<Response, AppError> {
    let GenerateReportRequest {
        document_id,
        persist,
    } = payload;

    let reports = state.reports.clone();
    let requested = document_id.clone();
    let result = tokio::task::spawn_blocking(move || reports.generate(&requested, persist))
        .await
        .map_err(|err| AppError::Server(axum::Error::new(err)))?;

    let response = match result {
        Ok(report) => (
            StatusCode::OK,
            Json(GenerateReportResponse {
                outcome: ReportOutcome {
                    success: true,
                    document: Some(report.document),
                    error: None,
                },
                artifact: report.artifact.map(|path| path.display().to_string()),
            }),
        )
            .into_response(),
        Err(err) => {
            warn!(%document_id, %err, "report request failed");
            (
                err.status_code(),
                Json(GenerateReportResponse {
                    outcome: ReportOutcome {
                        success: false,
                        document: None,
                        error: Some(err.to_string()),
                    },
                    artifact: None,
                }),
            )
                .into_response()
        }
    };
    Ok(response)
}

pub(crate) async fn report_html_endpoint(
    Extension(state): Extension<AppState>,
    Path(document_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let reports = state.reports.clone();
    let report = tokio::task::spawn_blocking(move || reports.generate(&document_id, false))
        .await
        .map_err(|err| AppError::Server(axum::Error::new(err)))??;
    Ok(Html(report.html))
}
