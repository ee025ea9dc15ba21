//! Application error type.
//!
//! A single error enum shared by all layers. Each variant carries enough
//! context to render a meaningful API error, and the `IntoResponse` impl
//! maps variants onto HTTP statuses plus the unified response envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::response::ApiResponse;

/// Convenience alias used throughout the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request body or parameter failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// No session exists for the given ID.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// A chat turn was attempted before a successful connect action.
    #[error("no database connection established for this session")]
    NotConnected,

    /// Opening the database connection failed (bad credentials,
    /// unreachable host, or missing database).
    #[error("database connection failed: {0}")]
    DatabaseConnection(String),

    /// Executing a query failed (invalid SQL or unknown objects).
    /// Generated SQL is executed verbatim, so model mistakes surface here.
    #[error("query execution failed: {0}")]
    DatabaseQuery(String),

    /// The model API was unreachable, rate-limited, or returned a
    /// malformed response.
    #[error("model service error: {0}")]
    ModelService(String),

    /// Invalid or missing configuration detected at startup.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Machine-readable error code for the API envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            AppError::NotConnected => "NOT_CONNECTED",
            AppError::DatabaseConnection(_) => "CONNECTION_ERROR",
            AppError::DatabaseQuery(_) => "QUERY_ERROR",
            AppError::ModelService(_) => "MODEL_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotConnected => StatusCode::CONFLICT,
            AppError::DatabaseConnection(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseQuery(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ModelService(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(code = self.code(), error = %self, "request failed");
        let body = ApiResponse::err(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_maps_to_bad_gateway() {
        let err = AppError::DatabaseConnection("refused".into());
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "CONNECTION_ERROR");
    }

    #[test]
    fn query_error_maps_to_unprocessable() {
        let err = AppError::DatabaseQuery("no such table: artist".into());
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "QUERY_ERROR");
    }

    #[test]
    fn not_connected_is_conflict() {
        assert_eq!(AppError::NotConnected.status(), StatusCode::CONFLICT);
    }
}
