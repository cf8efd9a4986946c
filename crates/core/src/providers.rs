//! Capability-provider traits.
//!
//! Each provider exposes one async call that either returns a result or
//! fails. Concrete backends live in `stolink-models` (Bedrock, Gemini) and
//! `stolink-cloud` (S3); tests substitute recording mocks.

use async_trait::async_trait;

/// Failure reported by a model backend.
///
/// Every variant displays its message verbatim: the text ends up in the
/// job's failure callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Transport, authentication, or malformed-response failure.
    #[error("{0}")]
    Provider(String),

    /// The backend refused the request on content grounds.
    #[error("{0}")]
    ContentPolicy(String),

    /// The backend answered but produced no image.
    #[error("{0}")]
    NoResult(String),
}

/// Failure reading from or writing to object storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct StorageError(pub String);

/// Text-to-text model used for prompt preparation.
#[async_trait]
pub trait PromptEngine: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_text: &str) -> Result<String, ProviderError>;
}

/// Text-to-image model.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, negative_prompt: &str) -> Result<Vec<u8>, ProviderError>;
}

/// Image-plus-instruction to image model.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    async fn edit(&self, source: &[u8], instruction: &str) -> Result<Vec<u8>, ProviderError>;
}

/// Public object storage for generated images.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under a key derived from `key_prefix` and return the
    /// public URL.
    async fn upload(&self, bytes: &[u8], key_prefix: &str) -> Result<String, StorageError>;

    /// Fetch the bytes behind a previously published URL.
    async fn download(&self, url: &str) -> Result<Vec<u8>, StorageError>;
}
