use application_tool::applicant::StagingError;
use application_tool::config::ConfigError;
use application_tool::repository::RepositoryError;
use application_tool::telemetry::TelemetryError;
use application_tool::versions::VersionError;
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
    Version(VersionError),
    Staging(StagingError),
    Repository(RepositoryError),
    Worker(tokio::task::JoinError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Version(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            AppError::Version(
                VersionError::InvalidQuestion { .. }
                | VersionError::InvalidLiveTarget { .. }
                | VersionError::DuplicateProgram { .. }
                | VersionError::DuplicateQuestion { .. }
                | VersionError::ProgramTombstoned { .. }
                | VersionError::QuestionInUse { .. }
                | VersionError::QuestionInvariantChanged { .. }
                | VersionError::Program(_),
            ) => StatusCode::BAD_REQUEST,
            AppError::Staging(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            AppError::Staging(
                StagingError::Version(_) | StagingError::Repository(_) | StagingError::Data(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Staging(_) => StatusCode::BAD_REQUEST,
            AppError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Version(_)
            | AppError::Repository(_)
            | AppError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Version(err) => write!(f, "version error: {}", err),
            AppError::Staging(err) => write!(f, "staging error: {}", err),
            AppError::Repository(err) => write!(f, "repository error: {}", err),
            AppError::Worker(err) => write!(f, "worker error: {}", err),
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
            AppError::Version(err) => Some(err),
            AppError::Staging(err) => Some(err),
            AppError::Repository(err) => Some(err),
            AppError::Worker(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
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

impl From<VersionError> for AppError {
    fn from(value: VersionError) -> Self {
        Self::Version(value)
    }
}

impl From<StagingError> for AppError {
    fn from(value: StagingError) -> Self {
        Self::Staging(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Worker(value)
    }
}
