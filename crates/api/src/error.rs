use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use stolink_core::providers::StorageError;
use stolink_worker::ConsumerError;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent `{error, code}` JSON
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Object storage failure (upload endpoint).
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Broker failure (queue test endpoint).
    #[error(transparent)]
    Queue(#[from] ConsumerError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A dependency the request needs is down.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Storage(err) => {
                tracing::error!(error = %err, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", err.to_string())
            }

            AppError::Queue(ConsumerError::NotConnected) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "RabbitMQ not connected".to_string(),
            ),
            AppError::Queue(err) => {
                tracing::error!(error = %err, "Queue error");
                (StatusCode::INTERNAL_SERVER_ERROR, "QUEUE_ERROR", err.to_string())
            }

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                msg.clone(),
            ),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
