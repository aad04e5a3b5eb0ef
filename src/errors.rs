use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use thiserror::Error;

/// The error taxonomy from spec.md §7, carried as one enum so every pipeline
/// stage and HTTP handler can return `Result<_, AppError>` uniformly
/// (teacher's `AppError` pattern, generalized).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Db(sqlx::Error),
    #[error("transient I/O error: {0}")]
    TransientIo(String),
    #[error("not found: {0}")]
    ResourceNotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("duplicate on content hash")]
    DuplicateOnHash,
    #[error("duplicate on (source_id, external_id)")]
    DuplicateOnExternalId,
    #[error("downstream failure: {0}")]
    DownstreamFailure(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("shutdown requested")]
    ShutdownCancelled,
    #[error("external error: {0}")]
    External(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::ResourceNotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
            AppError::TransientIo(msg) => {
                let mut headers = HeaderMap::new();
                headers.insert("Retry-After", HeaderValue::from_static("30"));
                (StatusCode::SERVICE_UNAVAILABLE, headers, msg).into_response()
            }
            AppError::DuplicateOnHash | AppError::DuplicateOnExternalId => {
                (StatusCode::CONFLICT, self.to_string()).into_response()
            }
            AppError::External(msg) | AppError::DownstreamFailure(msg) => {
                (StatusCode::BAD_GATEWAY, msg).into_response()
            }
            AppError::Config(_) | AppError::Db(_) | AppError::ShutdownCancelled => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        AppError::TransientIo(value.to_string())
    }
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        AppError::Validation(value)
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(value: crate::config::ConfigError) -> Self {
        AppError::Config(value.to_string())
    }
}

/// Per-operation disposition a pipeline stage returns in addition to
/// `Result`, matching spec.md §9's "typed result values ... pattern-match on
/// {Ok, Retryable, Fatal, Skip}" translation of exceptions-as-control-flow.
#[derive(Debug)]
pub enum Disposition<T> {
    Ok(T),
    Retryable(AppError),
    Fatal(AppError),
    Skip(String),
}
