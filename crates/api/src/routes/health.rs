use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Service name reported by `GET /`.
pub const SERVICE_NAME: &str = "StoLink Image Worker";

/// Health check response payload.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests.
    pub status: &'static str,
    /// Whether the queue consumer currently holds a broker connection.
    pub rabbitmq_connected: bool,
}

/// GET / -- service banner.
async fn root() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

/// GET /health -- liveness plus broker connection state.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        rabbitmq_connected: state.consumer.is_connected().await,
    })
}

/// GET /ready -- 503 until the broker connection is up.
async fn readiness_check(State(state): State<AppState>) -> AppResult<Json<Value>> {
    if !state.consumer.is_connected().await {
        return Err(AppError::ServiceUnavailable(
            "RabbitMQ not connected".to_string(),
        ));
    }
    Ok(Json(json!({ "status": "ready" })))
}

/// Mount the root-level probe routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
}
