use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::audit::report::ArtifactError;
use crate::workflows::audit::{BundleError, ReportError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Report(ReportError),
    Artifact(ArtifactError),
    Bundle(BundleError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Report(err) => write!(f, "report error: {}", err),
            AppError::Artifact(err) => write!(f, "artifact error: {}", err),
            AppError::Bundle(err) => write!(f, "data directory error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Report(err) => Some(err),
            AppError::Artifact(err) => Some(err),
            AppError::Bundle(err) => Some(err),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Report(ReportError::DocumentNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Report(ReportError::MissingDocumentId) => StatusCode::BAD_REQUEST,
            AppError::Report(_)
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Artifact(_)
            | AppError::Bundle(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ReportError> for AppError {
    fn from(value: ReportError) -> Self {
        Self::Report(value)
    }
}

impl From<ArtifactError> for AppError {
    fn from(value: ArtifactError) -> Self {
        Self::Artifact(value)
    }
}

impl From<BundleError> for AppError {
    fn from(value: BundleError) -> Self {
        Self::Bundle(value)
    }
}
