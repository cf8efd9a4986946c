//! Per-message policy, independent of the AMQP transport.
//!
//! A delivery is either malformed (rejected without requeue, no callback)
//! or a [`Job`] that runs through the workflow, gets exactly one callback,
//! and is then acknowledged exactly once whatever the outcome.

use std::sync::Arc;

use async_trait::async_trait;
use lapin::options::{BasicAckOptions, BasicRejectOptions};
use stolink_core::Job;
use stolink_events::CallbackSender;
use stolink_pipeline::{ImageWorkflow, WorkflowOutcome};

use crate::consumer::ConsumerError;

/// Longest payload excerpt written to the log for a malformed message.
const PREVIEW_CHARS: usize = 200;

/// How a delivery is settled with the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Remove from the queue.
    Ack,
    /// Drop without requeue.
    Reject,
}

/// Settles one delivery with the broker.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> Result<(), ConsumerError>;

    /// Reject without requeue.
    async fn reject(&self) -> Result<(), ConsumerError>;
}

#[async_trait]
impl Acknowledger for lapin::acker::Acker {
    async fn ack(&self) -> Result<(), ConsumerError> {
        lapin::acker::Acker::ack(self, BasicAckOptions::default())
            .await
            .map_err(ConsumerError::Channel)
    }

    async fn reject(&self) -> Result<(), ConsumerError> {
        lapin::acker::Acker::reject(self, BasicRejectOptions { requeue: false })
            .await
            .map_err(ConsumerError::Channel)
    }
}

/// Runs queued jobs and reports their outcome.
#[derive(Clone)]
pub struct JobHandler {
    workflow: ImageWorkflow,
    callbacks: Arc<dyn CallbackSender>,
}

impl JobHandler {
    pub fn new(workflow: ImageWorkflow, callbacks: Arc<dyn CallbackSender>) -> Self {
        Self {
            workflow,
            callbacks,
        }
    }

    /// Decide what happens to a raw payload, running the job if it parses.
    pub async fn handle(&self, body: &[u8]) -> Disposition {
        let job = match Job::from_slice(body) {
            Ok(job) => job,
            Err(e) => {
                let preview: String = String::from_utf8_lossy(body)
                    .chars()
                    .take(PREVIEW_CHARS)
                    .collect();
                tracing::error!(
                    error = %e,
                    bytes = body.len(),
                    preview = %preview,
                    "Dropping malformed queue message",
                );
                return Disposition::Reject;
            }
        };

        self.process(job).await;
        Disposition::Ack
    }

    /// Run `job` and send its single callback. Returns whether the callback
    /// was accepted.
    pub async fn process(&self, job: Job) -> bool {
        tracing::info!(
            job_id = %job.job_id,
            project_id = %job.project_id,
            action = job.action.as_str(),
            "Processing image job",
        );

        let character_id = job.character_id.clone();
        let callback_url = job.callback_override().map(str::to_string);
        let job_id = job.job_id.clone();

        let delivered = match self.workflow.run(job).await {
            WorkflowOutcome::Completed { image_url } => {
                self.callbacks
                    .send_success(
                        &job_id,
                        &image_url,
                        character_id.as_deref(),
                        callback_url.as_deref(),
                    )
                    .await
            }
            WorkflowOutcome::Failed { error } => {
                self.callbacks
                    .send_failure(
                        &job_id,
                        &error,
                        character_id.as_deref(),
                        callback_url.as_deref(),
                    )
                    .await
            }
        };

        if !delivered {
            tracing::warn!(job_id = %job_id, "Callback was not delivered");
        }
        delivered
    }

    /// Handle one delivery and settle it through `acker`.
    pub async fn handle_delivery<A>(&self, body: &[u8], acker: &A) -> Result<Disposition, ConsumerError>
    where
        A: Acknowledger + ?Sized,
    {
        let disposition = self.handle(body).await;
        match disposition {
            Disposition::Ack => acker.ack().await?,
            Disposition::Reject => acker.reject().await?,
        }
        Ok(disposition)
    }
}
