//! Workflow driver and step implementations.
//!
//! [`ImageWorkflow::run`] walks the step graph from `START` to `END`,
//! threading one [`WorkflowState`] through each step. Steps never return
//! errors: a failing provider call is recorded on the state and routing
//! (plus each step's own guard) keeps later steps from calling providers.

use std::sync::Arc;

use stolink_core::providers::{ImageEditor, ImageGenerator, ObjectStore, PromptEngine};
use stolink_core::{CoreError, ImageAction, Job};
use tracing::Instrument;

use crate::prompts;
use crate::state::{next_step, Step, WorkflowOutcome, WorkflowState, NO_IMAGE_PRODUCED};

/// Upload key prefix for newly generated characters.
pub const CHARACTER_PREFIX: &str = "character";

/// Upload key prefix for edited images.
pub const EDITED_PREFIX: &str = "edited";

/// Capability providers the workflow calls, injected at startup.
#[derive(Clone)]
pub struct Providers {
    pub prompt_engine: Arc<dyn PromptEngine>,
    pub image_generator: Arc<dyn ImageGenerator>,
    pub image_editor: Arc<dyn ImageEditor>,
    pub object_store: Arc<dyn ObjectStore>,
}

/// The image job workflow.
///
/// Holds only shared provider handles; one instance serves every job.
#[derive(Clone)]
pub struct ImageWorkflow {
    providers: Providers,
}

impl ImageWorkflow {
    pub fn new(providers: Providers) -> Self {
        Self { providers }
    }

    /// Run `job` to completion and return its outcome.
    pub async fn run(&self, job: Job) -> WorkflowOutcome {
        self.run_to_end(job).await.into_outcome()
    }

    /// Run `job` and return the raw terminal state.
    pub async fn run_to_end(&self, job: Job) -> WorkflowState {
        let span = tracing::info_span!(
            "workflow",
            job_id = %job.job_id,
            action = job.action.as_str(),
        );

        async move {
            let mut state = WorkflowState::new(job);
            let mut step = Step::Start;

            while step != Step::End {
                state = self.execute(step, state).await;
                step = next_step(step, &state);
            }

            match &state.error {
                Some(error) => tracing::warn!(error = %error, "Workflow failed"),
                None => tracing::info!(
                    image_url = state.result_image_url.as_deref().unwrap_or_default(),
                    "Workflow completed",
                ),
            }
            state
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, step: Step, state: WorkflowState) -> WorkflowState {
        tracing::debug!(step = step.name(), "Entering step");
        match step {
            Step::Start => self.start(state),
            Step::GeneratePrompt => self.generate_prompt(state).await,
            Step::CreateImage => self.create_image(state).await,
            Step::EditImage => self.edit_image(state).await,
            Step::Upload => self.upload(state).await,
            Step::End => state,
        }
    }

    // ---- steps ----

    /// Validate the job before any provider is touched.
    fn start(&self, state: WorkflowState) -> WorkflowState {
        match state.job.validate() {
            Ok(()) => state,
            Err(CoreError::Validation(msg)) => {
                tracing::warn!(error = %msg, "Job failed validation");
                state.fail(msg)
            }
            Err(other) => state.fail(other.to_string()),
        }
    }

    async fn generate_prompt(&self, mut state: WorkflowState) -> WorkflowState {
        if state.has_error() {
            return state;
        }

        let engine = &self.providers.prompt_engine;
        match state.job.action {
            ImageAction::Create => {
                let user_text = prompts::create_user_text(&state.job.message);
                let result = engine
                    .generate(prompts::CREATE_CHARACTER_SYSTEM_PROMPT, &user_text)
                    .await
                    .and_then(|raw| prompts::clean_create_prompt(&raw));

                match result {
                    Ok(prompt) => {
                        tracing::info!(prompt = %prompt, "Generation prompt ready");
                        state.enhanced_prompt = Some(prompt);
                        state
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Prompt generation failed");
                        state.fail(e.to_string())
                    }
                }
            }
            ImageAction::Edit => {
                let user_text = prompts::edit_user_text(state.job.edit_text());
                let result = engine
                    .generate(prompts::EDIT_IMAGE_SYSTEM_PROMPT, &user_text)
                    .await
                    .and_then(|raw| prompts::clean_edit_prompt(&raw));

                match result {
                    Ok(prompt) => {
                        tracing::info!(prompt = %prompt, "Edit prompt ready");
                        state.edit_prompt = Some(prompt);
                        state
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Edit prompt generation failed");
                        state.fail(e.to_string())
                    }
                }
            }
        }
    }

    async fn create_image(&self, mut state: WorkflowState) -> WorkflowState {
        if state.has_error() {
            return state;
        }
        let Some(prompt) = state.enhanced_prompt.as_deref() else {
            return state.fail("generation prompt missing");
        };

        match self
            .providers
            .image_generator
            .generate(prompt, prompts::NEGATIVE_PROMPT)
            .await
        {
            Ok(bytes) => {
                tracing::info!(bytes = bytes.len(), "Image generated");
                state.generated_image_bytes = Some(bytes);
                state
            }
            Err(e) => {
                tracing::error!(error = %e, "Image generation failed");
                state.fail(e.to_string())
            }
        }
    }

    async fn edit_image(&self, mut state: WorkflowState) -> WorkflowState {
        if state.has_error() {
            return state;
        }
        let (Some(source_url), Some(instruction)) =
            (state.job.source_image_url(), state.edit_prompt.as_deref())
        else {
            return state.fail("edit inputs missing");
        };

        let source = match self.providers.object_store.download(source_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(url = %source_url, error = %e, "Source image download failed");
                return state.fail(e.to_string());
            }
        };
        tracing::info!(bytes = source.len(), "Source image downloaded");

        match self.providers.image_editor.edit(&source, instruction).await {
            Ok(bytes) => {
                tracing::info!(bytes = bytes.len(), "Image edited");
                state.generated_image_bytes = Some(bytes);
                state
            }
            Err(e) => {
                tracing::error!(error = %e, "Image edit failed");
                state.fail(e.to_string())
            }
        }
    }

    /// Store the produced image. An empty result is recorded as a failure
    /// without calling the store.
    async fn upload(&self, mut state: WorkflowState) -> WorkflowState {
        if state.has_error() {
            return state;
        }
        let bytes = match state.generated_image_bytes.as_deref() {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return state.fail(NO_IMAGE_PRODUCED),
        };

        let prefix = match state.job.action {
            ImageAction::Create => CHARACTER_PREFIX,
            ImageAction::Edit => EDITED_PREFIX,
        };

        match self.providers.object_store.upload(bytes, prefix).await {
            Ok(url) => {
                tracing::info!(url = %url, "Image uploaded");
                state.result_image_url = Some(url);
                state
            }
            Err(e) => {
                tracing::error!(error = %e, "Image upload failed");
                state.fail(e.to_string())
            }
        }
    }
}
