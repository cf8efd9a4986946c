#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use stolink_api::config::ServerConfig;
use stolink_api::router::build_app_router;
use stolink_api::state::{AppState, FileUploader};
use stolink_core::providers::{
    ImageEditor, ImageGenerator, ObjectStore, PromptEngine, ProviderError, StorageError,
};
use stolink_pipeline::{ImageWorkflow, Providers};
use stolink_worker::{ConsumerConfig, ImageConsumer};

pub const CDN: &str = "https://cdn.example.com";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
    }
}

// ---------------------------------------------------------------------------
// Mock backends
// ---------------------------------------------------------------------------

/// Every capability provider in one struct. `generator_error` switches the
/// image generator to failure.
pub struct MockBackend {
    pub generator_error: Option<ProviderError>,
}

#[async_trait]
impl PromptEngine for MockBackend {
    async fn generate(&self, _system: &str, user_text: &str) -> Result<String, ProviderError> {
        Ok(format!("Professional ID photo, front view. {user_text}"))
    }
}

#[async_trait]
impl ImageGenerator for MockBackend {
    async fn generate(&self, _prompt: &str, _negative: &str) -> Result<Vec<u8>, ProviderError> {
        match &self.generator_error {
            Some(e) => Err(e.clone()),
            None => Ok(vec![1u8; 500]),
        }
    }
}

#[async_trait]
impl ImageEditor for MockBackend {
    async fn edit(&self, _source: &[u8], _instruction: &str) -> Result<Vec<u8>, ProviderError> {
        Ok(vec![2u8; 400])
    }
}

#[async_trait]
impl ObjectStore for MockBackend {
    async fn upload(&self, _bytes: &[u8], key_prefix: &str) -> Result<String, StorageError> {
        Ok(format!("{CDN}/media/{key_prefix}_test.png"))
    }

    async fn download(&self, _url: &str) -> Result<Vec<u8>, StorageError> {
        Ok(vec![3u8; 300])
    }
}

/// Records uploaded files.
#[derive(Default)]
pub struct MockFiles {
    pub uploads: Mutex<Vec<(String, String, usize)>>,
}

#[async_trait]
impl FileUploader for MockFiles {
    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.uploads
            .lock()
            .unwrap()
            .push((filename.to_string(), content_type.to_string(), bytes.len()));
        Ok(format!("{CDN}/media/upload_{filename}"))
    }
}

// ---------------------------------------------------------------------------
// App builders
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub files: Arc<MockFiles>,
}

/// Build the full application router with mock providers and a consumer
/// that never connects.
pub fn build_test_app(generator_error: Option<ProviderError>) -> TestApp {
    let config = test_config();
    let backend = Arc::new(MockBackend { generator_error });
    let files = Arc::new(MockFiles::default());

    let providers = Providers {
        prompt_engine: backend.clone(),
        image_generator: backend.clone(),
        image_editor: backend.clone(),
        object_store: backend,
    };

    let state = AppState {
        config: Arc::new(config.clone()),
        workflow: ImageWorkflow::new(providers),
        consumer: Arc::new(ImageConsumer::new(ConsumerConfig::default())),
        files: files.clone(),
    };

    TestApp {
        router: build_app_router(state, &config),
        files,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
