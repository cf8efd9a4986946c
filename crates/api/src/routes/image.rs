//! Synchronous image endpoints.
//!
//! Both run the full workflow inside the request, bypassing the queue and
//! the callback. Workflow failures are reported in the body with
//! `success: false`, not as an HTTP error.

use axum::extract::State;
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use stolink_core::{ImageAction, Job};
use stolink_pipeline::WorkflowOutcome;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerateRequest {
    pub message: String,
    pub job_id: Option<String>,
    pub character_id: Option<String>,
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEditRequest {
    pub image_url: String,
    pub edit_request: String,
    pub job_id: Option<String>,
    pub character_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub success: bool,
    pub image_url: Option<String>,
    pub error: Option<String>,
}

impl From<WorkflowOutcome> for ImageResponse {
    fn from(outcome: WorkflowOutcome) -> Self {
        match outcome {
            WorkflowOutcome::Completed { image_url } => Self {
                success: true,
                image_url: Some(image_url),
                error: None,
            },
            WorkflowOutcome::Failed { error } => Self {
                success: false,
                image_url: None,
                error: Some(error),
            },
        }
    }
}

/// Id for a manual run that did not supply one.
fn manual_job_id(job_id: Option<String>) -> String {
    job_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("manual-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]))
}

/// POST /api/image/generate
async fn generate_image(
    State(state): State<AppState>,
    Json(request): Json<ImageGenerateRequest>,
) -> Json<ImageResponse> {
    let job = Job {
        job_id: manual_job_id(request.job_id),
        project_id: request.project_id.unwrap_or_default(),
        action: ImageAction::Create,
        message: request.message,
        character_id: request.character_id,
        image_url: None,
        edit_request: None,
        callback_url: None,
    };
    tracing::info!(job_id = %job.job_id, "Manual image generation request");

    Json(state.workflow.run(job).await.into())
}

/// POST /api/image/edit
async fn edit_image(
    State(state): State<AppState>,
    Json(request): Json<ImageEditRequest>,
) -> Json<ImageResponse> {
    let job = Job {
        job_id: manual_job_id(request.job_id),
        project_id: String::new(),
        action: ImageAction::Edit,
        message: request.edit_request.clone(),
        character_id: request.character_id,
        image_url: Some(request.image_url),
        edit_request: Some(request.edit_request),
        callback_url: None,
    };
    tracing::info!(job_id = %job.job_id, "Manual image edit request");

    Json(state.workflow.run(job).await.into())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate_image))
        .route("/edit", post(edit_image))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_job_id_keeps_supplied_id() {
        assert_eq!(manual_job_id(Some("job-7".into())), "job-7");
    }

    #[test]
    fn manual_job_id_generates_short_id() {
        let id = manual_job_id(None);
        assert!(id.starts_with("manual-"));
        assert_eq!(id.len(), "manual-".len() + 8);

        assert!(manual_job_id(Some("  ".into())).starts_with("manual-"));
    }

    #[test]
    fn failed_outcome_maps_to_unsuccessful_response() {
        let response = ImageResponse::from(WorkflowOutcome::Failed {
            error: "blocked".into(),
        });
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": false, "imageUrl": null, "error": "blocked" })
        );
    }
}
