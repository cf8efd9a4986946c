use std::sync::Arc;

use async_trait::async_trait;
use stolink_cloud::S3ObjectStore;
use stolink_core::providers::StorageError;
use stolink_pipeline::ImageWorkflow;
use stolink_worker::ImageConsumer;

use crate::config::ServerConfig;

/// Key prefix for files stored through the upload endpoint.
pub const UPLOAD_PREFIX: &str = "upload";

/// Stores arbitrary uploaded files and returns their public URL.
#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

#[async_trait]
impl FileUploader for S3ObjectStore {
    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        S3ObjectStore::upload_file(self, bytes, filename, content_type, UPLOAD_PREFIX).await
    }
}

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable: every field is an `Arc` or wraps `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Workflow used by the synchronous image endpoints.
    pub workflow: ImageWorkflow,
    /// Queue consumer; read for health, used to publish test jobs.
    pub consumer: Arc<ImageConsumer>,
    pub files: Arc<dyn FileUploader>,
}
