//! Recording provider mocks shared by the workflow tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stolink_core::providers::{
    ImageEditor, ImageGenerator, ObjectStore, PromptEngine, ProviderError, StorageError,
};
use stolink_core::{ImageAction, Job};
use stolink_pipeline::Providers;

pub const IMAGE_BYTES: &[u8] = b"\x89PNG fake image";
pub const UPLOADED_URL: &str = "https://cdn.example.com/media/character_20250101_000000_abcd1234.png";

// ---------------------------------------------------------------------------
// Mocks
// ---------------------------------------------------------------------------

pub struct MockPromptEngine {
    pub reply: Result<String, ProviderError>,
    pub calls: AtomicUsize,
    pub last_system_prompt: Mutex<Option<String>>,
    pub last_user_text: Mutex<Option<String>>,
}

#[async_trait]
impl PromptEngine for MockPromptEngine {
    async fn generate(&self, system_prompt: &str, user_text: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_system_prompt.lock().unwrap() = Some(system_prompt.to_string());
        *self.last_user_text.lock().unwrap() = Some(user_text.to_string());
        self.reply.clone()
    }
}

pub struct MockGenerator {
    pub reply: Result<Vec<u8>, ProviderError>,
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<Option<(String, String)>>,
}

#[async_trait]
impl ImageGenerator for MockGenerator {
    async fn generate(&self, prompt: &str, negative_prompt: &str) -> Result<Vec<u8>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some((prompt.to_string(), negative_prompt.to_string()));
        self.reply.clone()
    }
}

pub struct MockEditor {
    pub reply: Result<Vec<u8>, ProviderError>,
    pub calls: AtomicUsize,
    pub last_instruction: Mutex<Option<String>>,
}

#[async_trait]
impl ImageEditor for MockEditor {
    async fn edit(&self, _source: &[u8], instruction: &str) -> Result<Vec<u8>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_instruction.lock().unwrap() = Some(instruction.to_string());
        self.reply.clone()
    }
}

pub struct MockStore {
    pub upload_reply: Result<String, StorageError>,
    pub download_reply: Result<Vec<u8>, StorageError>,
    pub uploads: AtomicUsize,
    pub downloads: AtomicUsize,
    pub last_prefix: Mutex<Option<String>>,
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn upload(&self, _bytes: &[u8], key_prefix: &str) -> Result<String, StorageError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        *self.last_prefix.lock().unwrap() = Some(key_prefix.to_string());
        self.upload_reply.clone()
    }

    async fn download(&self, _url: &str) -> Result<Vec<u8>, StorageError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.download_reply.clone()
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Every mock, kept alongside the [`Providers`] built from them so tests can
/// inspect call counts after a run.
pub struct Harness {
    pub prompt: Arc<MockPromptEngine>,
    pub generator: Arc<MockGenerator>,
    pub editor: Arc<MockEditor>,
    pub store: Arc<MockStore>,
}

impl Harness {
    /// All providers succeed.
    pub fn happy(prompt_reply: &str) -> Self {
        Self {
            prompt: Arc::new(MockPromptEngine {
                reply: Ok(prompt_reply.to_string()),
                calls: AtomicUsize::new(0),
                last_system_prompt: Mutex::new(None),
                last_user_text: Mutex::new(None),
            }),
            generator: Arc::new(MockGenerator {
                reply: Ok(IMAGE_BYTES.to_vec()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }),
            editor: Arc::new(MockEditor {
                reply: Ok(IMAGE_BYTES.to_vec()),
                calls: AtomicUsize::new(0),
                last_instruction: Mutex::new(None),
            }),
            store: Arc::new(MockStore {
                upload_reply: Ok(UPLOADED_URL.to_string()),
                download_reply: Ok(IMAGE_BYTES.to_vec()),
                uploads: AtomicUsize::new(0),
                downloads: AtomicUsize::new(0),
                last_prefix: Mutex::new(None),
            }),
        }
    }

    pub fn with_prompt_reply(mut self, reply: Result<String, ProviderError>) -> Self {
        self.prompt = Arc::new(MockPromptEngine {
            reply,
            calls: AtomicUsize::new(0),
            last_system_prompt: Mutex::new(None),
            last_user_text: Mutex::new(None),
        });
        self
    }

    pub fn with_generator_reply(mut self, reply: Result<Vec<u8>, ProviderError>) -> Self {
        self.generator = Arc::new(MockGenerator {
            reply,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        });
        self
    }

    pub fn with_editor_reply(mut self, reply: Result<Vec<u8>, ProviderError>) -> Self {
        self.editor = Arc::new(MockEditor {
            reply,
            calls: AtomicUsize::new(0),
            last_instruction: Mutex::new(None),
        });
        self
    }

    pub fn with_store(
        mut self,
        upload_reply: Result<String, StorageError>,
        download_reply: Result<Vec<u8>, StorageError>,
    ) -> Self {
        self.store = Arc::new(MockStore {
            upload_reply,
            download_reply,
            uploads: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
            last_prefix: Mutex::new(None),
        });
        self
    }

    pub fn providers(&self) -> Providers {
        Providers {
            prompt_engine: self.prompt.clone(),
            image_generator: self.generator.clone(),
            image_editor: self.editor.clone(),
            object_store: self.store.clone(),
        }
    }

    /// Total provider calls of every kind.
    pub fn provider_calls(&self) -> usize {
        self.prompt.calls.load(Ordering::SeqCst)
            + self.generator.calls.load(Ordering::SeqCst)
            + self.editor.calls.load(Ordering::SeqCst)
            + self.store.uploads.load(Ordering::SeqCst)
            + self.store.downloads.load(Ordering::SeqCst)
    }
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

pub fn create_job(message: &str) -> Job {
    Job {
        job_id: "job-create".into(),
        project_id: "proj-1".into(),
        action: ImageAction::Create,
        message: message.into(),
        character_id: Some("char-1".into()),
        image_url: None,
        edit_request: None,
        callback_url: None,
    }
}

pub fn edit_job(image_url: &str, edit_request: Option<&str>) -> Job {
    Job {
        job_id: "job-edit".into(),
        project_id: "proj-1".into(),
        action: ImageAction::Edit,
        message: "fallback edit text".into(),
        character_id: Some("char-1".into()),
        image_url: Some(image_url.into()),
        edit_request: edit_request.map(str::to_string),
        callback_url: None,
    }
}
