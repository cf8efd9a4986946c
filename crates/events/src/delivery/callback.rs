//! Best-effort callback delivery.
//!
//! [`CallbackDispatcher`] sends a JSON-encoded [`CallbackPayload`] to the
//! job's callback URL (or the configured default) via a single HTTP POST.
//! There is no retry: a failed delivery is logged and reported as `false`,
//! never raised to the caller.

use std::time::Duration;

use async_trait::async_trait;
use stolink_core::CallbackPayload;

/// HTTP statuses that count as a delivered callback.
const ACCEPTED_STATUSES: [u16; 3] = [200, 201, 202];

/// Default timeout for the callback POST.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default endpoint when a job does not carry its own `callbackUrl`.
const DEFAULT_CALLBACK_URL: &str = "http://localhost:8080/api/internal/ai/image/callback";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Callback dispatcher configuration.
#[derive(Debug, Clone)]
pub struct CallbackConfig {
    /// Process-wide default endpoint.
    pub default_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl CallbackConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                                                |
    /// |-------------------------|--------------------------------------------------------|
    /// | `SPRING_CALLBACK_URL`   | `http://localhost:8080/api/internal/ai/image/callback` |
    /// | `CALLBACK_TIMEOUT_SECS` | `30`                                                   |
    pub fn from_env() -> Self {
        let default_url =
            std::env::var("SPRING_CALLBACK_URL").unwrap_or_else(|_| DEFAULT_CALLBACK_URL.into());

        let timeout_secs: u64 = std::env::var("CALLBACK_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("CALLBACK_TIMEOUT_SECS must be a valid u64");

        Self {
            default_url,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            default_url: DEFAULT_CALLBACK_URL.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for callback delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server answered with a status outside 200/201/202.
    #[error("Callback returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
}

// ---------------------------------------------------------------------------
// Sender seam
// ---------------------------------------------------------------------------

/// Reports the terminal status of a job.
///
/// Both methods return `true` iff the notification was accepted by the
/// receiving endpoint. Neither ever fails loudly.
#[async_trait]
pub trait CallbackSender: Send + Sync {
    async fn send_success(
        &self,
        job_id: &str,
        image_url: &str,
        character_id: Option<&str>,
        callback_url: Option<&str>,
    ) -> bool;

    async fn send_failure(
        &self,
        job_id: &str,
        error: &str,
        character_id: Option<&str>,
        callback_url: Option<&str>,
    ) -> bool;
}

// ---------------------------------------------------------------------------
// CallbackDispatcher
// ---------------------------------------------------------------------------

/// Delivers job outcomes to the calling system over HTTP.
pub struct CallbackDispatcher {
    client: reqwest::Client,
    default_url: String,
}

impl CallbackDispatcher {
    /// Create a dispatcher with a client bounded by `config.timeout`.
    pub fn new(config: &CallbackConfig) -> Result<Self, CallbackError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            default_url: config.default_url.clone(),
        })
    }

    /// The endpoint used when a job carries no override.
    pub fn default_url(&self) -> &str {
        &self.default_url
    }

    /// POST `payload` once and report whether it was accepted.
    pub async fn dispatch(&self, payload: &CallbackPayload, callback_url: Option<&str>) -> bool {
        let url = callback_url
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.default_url);

        match self.try_send(url, payload).await {
            Ok(()) => {
                tracing::info!(job_id = %payload.job_id, url, "Callback sent");
                true
            }
            Err(CallbackError::Request(e)) if e.is_timeout() => {
                tracing::error!(job_id = %payload.job_id, url, "Callback timed out");
                false
            }
            Err(e @ CallbackError::HttpStatus { .. }) => {
                tracing::warn!(job_id = %payload.job_id, url, error = %e, "Callback rejected");
                false
            }
            Err(e) => {
                tracing::error!(job_id = %payload.job_id, url, error = %e, "Callback request failed");
                false
            }
        }
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, url: &str, payload: &CallbackPayload) -> Result<(), CallbackError> {
        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status().as_u16();
        if !ACCEPTED_STATUSES.contains(&status) {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(CallbackError::HttpStatus { status, body });
        }
        Ok(())
    }
}

#[async_trait]
impl CallbackSender for CallbackDispatcher {
    async fn send_success(
        &self,
        job_id: &str,
        image_url: &str,
        character_id: Option<&str>,
        callback_url: Option<&str>,
    ) -> bool {
        let payload = CallbackPayload::completed(job_id, image_url, character_id);
        self.dispatch(&payload, callback_url).await
    }

    async fn send_failure(
        &self,
        job_id: &str,
        error: &str,
        character_id: Option<&str>,
        callback_url: Option<&str>,
    ) -> bool {
        let payload = CallbackPayload::failed(job_id, error, character_id);
        self.dispatch(&payload, callback_url).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
