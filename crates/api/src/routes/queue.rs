//! Test hook that publishes a job to the image queue, so the full
//! queue → consumer → callback path can be exercised without the upstream
//! service.

use axum::extract::State;
use axum::{routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use stolink_core::ImageAction;

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePublishRequest {
    pub project_id: String,
    pub action: ImageAction,
    pub message: String,
    pub character_id: Option<String>,
    pub image_url: Option<String>,
    pub edit_request: Option<String>,
    pub callback_url: Option<String>,
}

/// `test-` followed by 8 hex characters.
pub fn test_job_id() -> String {
    format!("test-{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
}

/// Queue message in the upstream wire format. Absent options are `null`.
pub fn queue_payload(job_id: &str, request: &QueuePublishRequest) -> Value {
    json!({
        "jobId": job_id,
        "projectId": request.project_id,
        "action": request.action.as_str(),
        "message": request.message,
        "characterId": request.character_id,
        "imageUrl": request.image_url,
        "editRequest": request.edit_request,
        "callbackUrl": request.callback_url,
    })
}

/// POST /api/test/queue
async fn publish_to_queue(
    State(state): State<AppState>,
    Json(request): Json<QueuePublishRequest>,
) -> AppResult<Json<Value>> {
    let job_id = test_job_id();
    let payload = queue_payload(&job_id, &request);

    state.consumer.publish(&payload).await?;
    tracing::info!(job_id = %job_id, queue = state.consumer.queue(), "Published test message");

    Ok(Json(json!({
        "success": true,
        "message": "Message published to queue",
        "jobId": job_id,
        "payload": payload,
    })))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/queue", post(publish_to_queue))
}
