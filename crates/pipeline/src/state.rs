//! Workflow state, step identifiers, routing, and terminal outcome.

use stolink_core::{ImageAction, Job};

/// Reported when a run ends without an image and without a recorded error.
pub const NO_IMAGE_PRODUCED: &str = "no image was produced";

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Nodes of the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Start,
    GeneratePrompt,
    CreateImage,
    EditImage,
    Upload,
    End,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::Start => "start",
            Step::GeneratePrompt => "generate_prompt",
            Step::CreateImage => "create_image",
            Step::EditImage => "edit_image",
            Step::Upload => "upload",
            Step::End => "end",
        }
    }
}

/// Pick the step that follows `step` given the state it produced.
///
/// An error after `START` or `GENERATE_PROMPT` routes straight to `END`.
/// Later steps are linear and guard on the error themselves.
pub fn next_step(step: Step, state: &WorkflowState) -> Step {
    match step {
        Step::Start if state.has_error() => Step::End,
        Step::Start => Step::GeneratePrompt,
        Step::GeneratePrompt if state.has_error() => Step::End,
        Step::GeneratePrompt => match state.job.action {
            ImageAction::Create => Step::CreateImage,
            ImageAction::Edit => Step::EditImage,
        },
        Step::CreateImage | Step::EditImage => Step::Upload,
        Step::Upload | Step::End => Step::End,
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Record threaded through every step of one run.
///
/// Once `error` is set no step performs a provider call or touches
/// `generated_image_bytes` / `result_image_url`.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub job: Job,
    /// Generation prompt (create path).
    pub enhanced_prompt: Option<String>,
    /// Edit instruction (edit path).
    pub edit_prompt: Option<String>,
    pub generated_image_bytes: Option<Vec<u8>>,
    pub result_image_url: Option<String>,
    pub error: Option<String>,
}

impl WorkflowState {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            enhanced_prompt: None,
            edit_prompt: None,
            generated_image_bytes: None,
            result_image_url: None,
            error: None,
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Record a failure. The first recorded error wins.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        if self.error.is_none() {
            self.error = Some(error.into());
        }
        self
    }

    /// Collapse the terminal state into an outcome.
    pub fn into_outcome(self) -> WorkflowOutcome {
        match (self.result_image_url, self.error) {
            (Some(image_url), None) => WorkflowOutcome::Completed { image_url },
            (None, Some(error)) => WorkflowOutcome::Failed { error },
            (None, None) => WorkflowOutcome::Failed {
                error: NO_IMAGE_PRODUCED.to_string(),
            },
            (Some(image_url), Some(error)) => {
                tracing::error!(
                    job_id = %self.job.job_id,
                    image_url = %image_url,
                    error = %error,
                    "Workflow ended with both a result and an error",
                );
                WorkflowOutcome::Failed { error }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Terminal result of one run: a stored image or an error, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Completed { image_url: String },
    Failed { error: String },
}

impl WorkflowOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, WorkflowOutcome::Completed { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
