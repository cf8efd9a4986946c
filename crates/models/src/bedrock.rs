//! AWS Bedrock model clients.
//!
//! Both clients go through `InvokeModel` with a JSON body and map a
//! content-filter refusal to [`ProviderError::ContentPolicy`].

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use stolink_core::providers::{ImageGenerator, PromptEngine, ProviderError};

/// Upper bound on prompt-engine output.
const CLAUDE_MAX_TOKENS: u32 = 1024;

/// Square output size for generated images.
const NOVA_IMAGE_SIZE: u32 = 1024;

/// Prompt adherence for Nova Canvas.
const NOVA_CFG_SCALE: f64 = 8.0;

const JSON: &str = "application/json";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Bedrock model selection.
#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub region: String,
    pub claude_model_id: String,
    pub nova_canvas_model_id: String,
}

impl BedrockConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                                       |
    /// |--------------------------------|-----------------------------------------------|
    /// | `AWS_REGION`                   | `us-east-1`                                   |
    /// | `BEDROCK_CLAUDE_MODEL_ID`      | `us.anthropic.claude-3-5-haiku-20241022-v1:0` |
    /// | `BEDROCK_NOVA_CANVAS_MODEL_ID` | `amazon.nova-canvas-v1:0`                     |
    pub fn from_env() -> Self {
        Self {
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".into()),
            claude_model_id: std::env::var("BEDROCK_CLAUDE_MODEL_ID")
                .unwrap_or_else(|_| "us.anthropic.claude-3-5-haiku-20241022-v1:0".into()),
            nova_canvas_model_id: std::env::var("BEDROCK_NOVA_CANVAS_MODEL_ID")
                .unwrap_or_else(|_| "amazon.nova-canvas-v1:0".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared invoke
// ---------------------------------------------------------------------------

async fn invoke(
    client: &aws_sdk_bedrockruntime::Client,
    model_id: &str,
    body: &serde_json::Value,
) -> Result<Vec<u8>, ProviderError> {
    let payload = serde_json::to_vec(body)
        .map_err(|e| ProviderError::Provider(format!("Failed to encode request: {e}")))?;

    let output = client
        .invoke_model()
        .model_id(model_id)
        .content_type(JSON)
        .accept(JSON)
        .body(Blob::new(payload))
        .send()
        .await
        .map_err(|e| {
            let detail = DisplayErrorContext(&e).to_string();
            if detail.to_lowercase().contains("content filter") {
                ProviderError::ContentPolicy(detail)
            } else {
                ProviderError::Provider(format!("{model_id} invocation failed: {detail}"))
            }
        })?;

    Ok(output.body().as_ref().to_vec())
}

// ---------------------------------------------------------------------------
// Claude prompt engine
// ---------------------------------------------------------------------------

/// Claude on Bedrock as a text-to-text prompt engine.
pub struct BedrockPromptEngine {
    client: aws_sdk_bedrockruntime::Client,
    model_id: String,
}

impl BedrockPromptEngine {
    pub fn new(sdk_config: &SdkConfig, config: &BedrockConfig) -> Self {
        Self {
            client: aws_sdk_bedrockruntime::Client::new(sdk_config),
            model_id: config.claude_model_id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic messages body for a single-turn request.
pub fn claude_request_body(system_prompt: &str, user_text: &str) -> serde_json::Value {
    json!({
        "anthropic_version": "bedrock-2023-05-31",
        "max_tokens": CLAUDE_MAX_TOKENS,
        "system": system_prompt,
        "messages": [{ "role": "user", "content": user_text }],
    })
}

/// Concatenate the text blocks of a Claude response.
pub fn parse_claude_response(body: &[u8]) -> Result<String, ProviderError> {
    let response: ClaudeResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::Provider(format!("Unreadable Claude response: {e}")))?;

    let text: String = response
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect();

    if text.trim().is_empty() {
        return Err(ProviderError::NoResult("Claude returned no text".into()));
    }
    Ok(text)
}

#[async_trait]
impl PromptEngine for BedrockPromptEngine {
    async fn generate(&self, system_prompt: &str, user_text: &str) -> Result<String, ProviderError> {
        let body = claude_request_body(system_prompt, user_text);
        let raw = invoke(&self.client, &self.model_id, &body).await?;
        parse_claude_response(&raw)
    }
}

// ---------------------------------------------------------------------------
// Nova Canvas generator
// ---------------------------------------------------------------------------

/// Amazon Nova Canvas as a text-to-image generator.
pub struct NovaCanvasGenerator {
    client: aws_sdk_bedrockruntime::Client,
    model_id: String,
}

impl NovaCanvasGenerator {
    pub fn new(sdk_config: &SdkConfig, config: &BedrockConfig) -> Self {
        Self {
            client: aws_sdk_bedrockruntime::Client::new(sdk_config),
            model_id: config.nova_canvas_model_id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NovaResponse {
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

/// TEXT_IMAGE task body; an empty negative prompt is omitted.
pub fn nova_request_body(prompt: &str, negative_prompt: &str) -> serde_json::Value {
    let mut params = json!({ "text": prompt });
    if !negative_prompt.is_empty() {
        params["negativeText"] = json!(negative_prompt);
    }

    json!({
        "taskType": "TEXT_IMAGE",
        "textToImageParams": params,
        "imageGenerationConfig": {
            "numberOfImages": 1,
            "width": NOVA_IMAGE_SIZE,
            "height": NOVA_IMAGE_SIZE,
            "cfgScale": NOVA_CFG_SCALE,
            "seed": 0,
        },
    })
}

/// Decode the first image of a Nova Canvas response.
pub fn parse_nova_response(body: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let response: NovaResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::Provider(format!("Unreadable Nova Canvas response: {e}")))?;

    if let Some(error) = response.error.filter(|e| !e.is_empty()) {
        return Err(ProviderError::ContentPolicy(error));
    }

    let encoded = response
        .images
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::NoResult("Nova Canvas returned no image".into()))?;

    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| ProviderError::Provider(format!("Invalid image encoding: {e}")))
}

#[async_trait]
impl ImageGenerator for NovaCanvasGenerator {
    async fn generate(&self, prompt: &str, negative_prompt: &str) -> Result<Vec<u8>, ProviderError> {
        let body = nova_request_body(prompt, negative_prompt);
        let raw = invoke(&self.client, &self.model_id, &body).await?;
        let image = parse_nova_response(&raw)?;
        tracing::debug!(bytes = image.len(), "Nova Canvas image generated");
        Ok(image)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
