//! Image job messages and callback payloads.
//!
//! A [`Job`] is deserialized from one queue message (camelCase JSON as
//! published by the calling system). A [`CallbackPayload`] is the single
//! terminal notification posted back once the job has run.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Validation message for an edit job that does not name a source image.
pub const MISSING_IMAGE_URL: &str = "image_url is required for edit action";

/// Validation message for a create job without a character description.
pub const MISSING_MESSAGE: &str = "message is required for create action";

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// What the job asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageAction {
    /// Generate a new character image from a description.
    Create,
    /// Edit an existing stored image.
    Edit,
}

impl ImageAction {
    /// Wire name of the action (`"create"` / `"edit"`).
    pub fn as_str(self) -> &'static str {
        match self {
            ImageAction::Create => "create",
            ImageAction::Edit => "edit",
        }
    }
}

/// One unit of work received from the image queue.
///
/// `projectId` and `message` default to empty strings when absent so that
/// an otherwise identifiable job still reaches the workflow and is reported
/// through its callback instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    #[serde(default)]
    pub project_id: String,
    pub action: ImageAction,
    /// Character description for create, fallback edit text for edit.
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub character_id: Option<String>,
    /// Source image for edit jobs.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Overrides `message` for edit jobs when non-empty.
    #[serde(default)]
    pub edit_request: Option<String>,
    /// Absent means the process-wide default callback endpoint.
    #[serde(default)]
    pub callback_url: Option<String>,
}

impl Job {
    /// Parse a raw queue payload.
    pub fn from_slice(body: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(body).map_err(|e| CoreError::Malformed(e.to_string()))
    }

    /// Check the cross-field invariants that serde cannot express.
    ///
    /// An edit job must carry a non-empty `image_url`.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self.action {
            ImageAction::Create if self.message.trim().is_empty() => {
                Err(CoreError::Validation(MISSING_MESSAGE.to_string()))
            }
            ImageAction::Edit if self.source_image_url().is_none() => {
                Err(CoreError::Validation(MISSING_IMAGE_URL.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// The source image URL, treating an empty string as absent.
    pub fn source_image_url(&self) -> Option<&str> {
        non_empty(self.image_url.as_deref())
    }

    /// Text to turn into an edit prompt: `edit_request` if present, else
    /// `message`.
    pub fn edit_text(&self) -> &str {
        non_empty(self.edit_request.as_deref()).unwrap_or(&self.message)
    }

    /// The per-job callback override, treating an empty string as absent.
    pub fn callback_override(&self) -> Option<&str> {
        non_empty(self.callback_url.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Callback payload
// ---------------------------------------------------------------------------

/// Terminal status reported to the calling system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackStatus {
    Completed,
    Failed,
}

/// Body of the callback POST.
///
/// `imageUrl` is set iff `status` is `completed`; `error` is set iff
/// `status` is `failed`. Build it through [`CallbackPayload::completed`] or
/// [`CallbackPayload::failed`] to keep that pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    pub job_id: String,
    pub character_id: Option<String>,
    pub status: CallbackStatus,
    pub image_url: Option<String>,
    pub error: Option<String>,
}

impl CallbackPayload {
    pub fn completed(job_id: &str, image_url: &str, character_id: Option<&str>) -> Self {
        Self {
            job_id: job_id.to_string(),
            character_id: character_id.map(str::to_string),
            status: CallbackStatus::Completed,
            image_url: Some(image_url.to_string()),
            error: None,
        }
    }

    pub fn failed(job_id: &str, error: &str, character_id: Option<&str>) -> Self {
        Self {
            job_id: job_id.to_string(),
            character_id: character_id.map(str::to_string),
            status: CallbackStatus::Failed,
            image_url: None,
            error: Some(error.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
