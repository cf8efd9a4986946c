//! Gemini image editing over the Generative Language REST API.
//!
//! The source image is sent inline with the instruction text; the first
//! inline image in the reply is re-encoded as PNG so every stored result
//! has the same format.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use stolink_core::providers::{ImageEditor, ProviderError};

/// Public Generative Language API endpoint.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default per-request timeout for the edit call.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Reported when a reply carries no image part.
const NO_IMAGE_MESSAGE: &str =
    "Gemini did not return an image. This might be due to content policy or invalid prompt.";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Gemini credentials and model selection.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model_id: String,
    /// Upper bound on one edit request, response body included.
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                  |
    /// |-------------------------|--------------------------|
    /// | `GEMINI_API_KEY`        | (empty)                  |
    /// | `GEMINI_IMAGE_MODEL_ID` | `gemini-2.5-flash-image` |
    /// | `GEMINI_TIMEOUT_SECS`   | `120`                    |
    pub fn from_env() -> Self {
        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            model_id: std::env::var("GEMINI_IMAGE_MODEL_ID")
                .unwrap_or_else(|_| "gemini-2.5-flash-image".into()),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// GeminiImageEditor
// ---------------------------------------------------------------------------

/// Gemini image model as an [`ImageEditor`].
pub struct GeminiImageEditor {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model_id: String,
    timeout: Duration,
}

impl GeminiImageEditor {
    pub fn new(config: &GeminiConfig) -> Result<Self, ProviderError> {
        Self::with_base_url(config, DEFAULT_BASE_URL.to_string())
    }

    /// Target a different API host (used by tests).
    pub fn with_base_url(config: &GeminiConfig, base_url: String) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Provider(format!("Failed to build Gemini client: {e}")))?;

        tracing::info!(
            model_id = %config.model_id,
            timeout_secs = config.timeout.as_secs(),
            "Gemini image editor configured",
        );
        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
            model_id: config.model_id.clone(),
            timeout: config.timeout,
        })
    }

    fn request_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Provider(format!(
                "Gemini request timed out after {}s",
                self.timeout.as_secs()
            ))
        } else {
            ProviderError::Provider(format!("Gemini request failed: {e}"))
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model_id
        )
    }
}

/// MIME type of an encoded image, `image/png` when unrecognised.
fn mime_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("image/png")
}

/// Decode any supported format and re-encode as PNG.
pub fn to_png(bytes: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| ProviderError::Provider(format!("Unreadable image from Gemini: {e}")))?;

    let mut out = Cursor::new(Vec::new());
    decoded
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| ProviderError::Provider(format!("Failed to encode PNG: {e}")))?;
    Ok(out.into_inner())
}

fn extract_image(response: GenerateContentResponse) -> Result<Vec<u8>, ProviderError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ProviderError::ContentPolicy(format!(
            "Gemini blocked the request: {reason}"
        )));
    }

    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    for part in parts {
        if let Some(inline) = part.inline_data {
            let raw = base64::engine::general_purpose::STANDARD
                .decode(inline.data)
                .map_err(|e| ProviderError::Provider(format!("Invalid image encoding: {e}")))?;
            return to_png(&raw);
        }
        if let Some(text) = part.text {
            tracing::info!(text = %text, "Gemini response text");
        }
    }

    Err(ProviderError::NoResult(NO_IMAGE_MESSAGE.into()))
}

#[async_trait]
impl ImageEditor for GeminiImageEditor {
    async fn edit(&self, source: &[u8], instruction: &str) -> Result<Vec<u8>, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::Provider("GEMINI_API_KEY is not set".into()));
        }

        let body = json!({
            "contents": [{
                "parts": [
                    { "text": instruction },
                    { "inline_data": {
                        "mime_type": mime_type(source),
                        "data": base64::engine::general_purpose::STANDARD.encode(source),
                    }},
                ],
            }],
            "generationConfig": { "responseModalities": ["IMAGE", "TEXT"] },
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::Provider(format!(
                "Gemini API error ({}): {text}",
                status.as_u16()
            )));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.request_error(e)
            } else {
                ProviderError::Provider(format!("Unreadable Gemini response: {e}"))
            }
        })?;

        let image = extract_image(parsed)?;
        tracing::info!(bytes = image.len(), "Gemini image edited");
        Ok(image)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
