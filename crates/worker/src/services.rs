//! Concrete provider wiring.
//!
//! Every backend is built once at startup from its own `from_env()` config
//! and shared through `Arc`s.

use std::sync::Arc;

use stolink_cloud::{AwsCredentials, S3Config, S3ObjectStore};
use stolink_core::providers::{ProviderError, StorageError};
use stolink_events::{CallbackConfig, CallbackDispatcher, CallbackError};
use stolink_models::{
    BedrockConfig, BedrockPromptEngine, GeminiConfig, GeminiImageEditor, NovaCanvasGenerator,
};
use stolink_pipeline::{ImageWorkflow, Providers};

use crate::handler::JobHandler;

/// A backend client could not be built at startup.
#[derive(Debug, thiserror::Error)]
pub enum ServicesError {
    #[error("Model client: {0}")]
    Provider(#[from] ProviderError),

    #[error("Object store: {0}")]
    Storage(#[from] StorageError),

    #[error("Callback dispatcher: {0}")]
    Callback(#[from] CallbackError),
}

/// Shared backends for the workflow, the HTTP surface and the consumer.
#[derive(Clone)]
pub struct Services {
    pub providers: Providers,
    /// Concrete store, also used directly by the upload endpoint.
    pub object_store: Arc<S3ObjectStore>,
    pub callbacks: Arc<CallbackDispatcher>,
}

impl Services {
    /// Build Bedrock, Gemini, S3 and callback clients from the environment.
    pub async fn from_env() -> Result<Self, ServicesError> {
        let credentials = AwsCredentials::from_env();
        let bedrock_config = BedrockConfig::from_env();
        let s3_config = S3Config::from_env();

        let bedrock_sdk = credentials.sdk_config(&bedrock_config.region).await;
        let s3_sdk = credentials.sdk_config(&s3_config.region).await;

        if s3_config.bucket.is_empty() {
            tracing::warn!("AWS_S3_BUCKET_NAME is not set, uploads will fail");
        }

        let object_store = Arc::new(S3ObjectStore::new(&s3_sdk, &s3_config)?);
        let providers = Providers {
            prompt_engine: Arc::new(BedrockPromptEngine::new(&bedrock_sdk, &bedrock_config)),
            image_generator: Arc::new(NovaCanvasGenerator::new(&bedrock_sdk, &bedrock_config)),
            image_editor: Arc::new(GeminiImageEditor::new(&GeminiConfig::from_env())?),
            object_store: object_store.clone(),
        };

        let callback_config = CallbackConfig::from_env();
        tracing::info!(default_url = %callback_config.default_url, "Callback dispatcher configured");
        let callbacks = Arc::new(CallbackDispatcher::new(&callback_config)?);

        Ok(Self {
            providers,
            object_store,
            callbacks,
        })
    }

    pub fn workflow(&self) -> ImageWorkflow {
        ImageWorkflow::new(self.providers.clone())
    }

    pub fn job_handler(&self) -> JobHandler {
        JobHandler::new(self.workflow(), self.callbacks.clone())
    }
}
