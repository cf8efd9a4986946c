//! S3-backed object store.
//!
//! Generated images are written under `media/` with a timestamped,
//! prefix-tagged key and published through CloudFront when a distribution
//! URL is configured, otherwise through the bucket's virtual-hosted S3 URL.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use stolink_core::providers::{ObjectStore, StorageError};

/// Key namespace for every object this service writes.
const MEDIA_DIR: &str = "media";

/// Content type of generated images.
const PNG_CONTENT_TYPE: &str = "image/png";

/// Default timeout for fetching a source image from outside the bucket.
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// S3 bucket configuration.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// CloudFront distribution base URL, if any.
    pub cloudfront_url: Option<String>,
    /// Upper bound on one download from a URL outside the bucket.
    pub download_timeout: Duration,
}

impl S3Config {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default          |
    /// |----------------------------|------------------|
    /// | `AWS_S3_BUCKET_NAME`       | (empty)          |
    /// | `AWS_S3_REGION`            | `ap-northeast-2` |
    /// | `CLOUDFRONT_URL`           | (unset)          |
    /// | `S3_DOWNLOAD_TIMEOUT_SECS` | `30`             |
    pub fn from_env() -> Self {
        let bucket = std::env::var("AWS_S3_BUCKET_NAME").unwrap_or_default();
        let region = std::env::var("AWS_S3_REGION").unwrap_or_else(|_| "ap-northeast-2".into());
        let cloudfront_url = std::env::var("CLOUDFRONT_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let download_timeout_secs = std::env::var("S3_DOWNLOAD_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS);

        Self {
            bucket,
            region,
            cloudfront_url,
            download_timeout: Duration::from_secs(download_timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Key / URL mapping
// ---------------------------------------------------------------------------

/// Pure mapping between object keys and public URLs for one bucket.
#[derive(Debug, Clone)]
pub struct ObjectLocator {
    bucket: String,
    region: String,
    cdn_base: Option<String>,
}

impl ObjectLocator {
    pub fn new(config: &S3Config) -> Self {
        Self {
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            cdn_base: config
                .cloudfront_url
                .as_deref()
                .map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    /// Build `media/{prefix}_{YYYYmmdd_HHMMSS}_{8 hex}.{extension}`.
    ///
    /// The random suffix keeps two uploads in the same second apart.
    pub fn object_key(&self, prefix: &str, extension: &str, now: DateTime<Utc>) -> String {
        let stamp = now.format("%Y%m%d_%H%M%S");
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{MEDIA_DIR}/{prefix}_{stamp}_{}.{extension}", &suffix[..8])
    }

    /// Public URL for `key`: CloudFront when configured, else S3.
    pub fn public_url(&self, key: &str) -> String {
        match &self.cdn_base {
            Some(base) => format!("{base}/{key}"),
            None => format!("{}/{key}", self.s3_base()),
        }
    }

    /// The object key behind `url` if it points into this bucket's S3 URL
    /// space.
    pub fn bucket_key<'a>(&self, url: &'a str) -> Option<&'a str> {
        let base = self.s3_base();
        url.strip_prefix(base.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
    }

    fn s3_base(&self) -> String {
        format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region)
    }
}

/// Extension of an uploaded file name, `bin` when there is none.
pub fn file_extension(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext,
        _ => "bin",
    }
}

/// HTTP client for source images that live outside the bucket.
pub fn download_client(timeout: Duration) -> Result<reqwest::Client, StorageError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| StorageError(format!("Failed to build download client: {e}")))
}

/// GET `url` and return the body, failing on any non-success status.
pub async fn fetch_url(http: &reqwest::Client, url: &str) -> Result<Vec<u8>, StorageError> {
    let describe = |e: reqwest::Error, action: &str| {
        if e.is_timeout() {
            StorageError(format!("Timed out while trying to {action} image from {url}"))
        } else {
            StorageError(format!("Failed to {action} image from {url}: {e}"))
        }
    };

    let response = http
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| describe(e, "download"))?;

    let bytes = response.bytes().await.map_err(|e| describe(e, "read"))?;
    Ok(bytes.to_vec())
}

// ---------------------------------------------------------------------------
// S3ObjectStore
// ---------------------------------------------------------------------------

/// [`ObjectStore`] backed by an S3 bucket.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    http: reqwest::Client,
    bucket: String,
    locator: ObjectLocator,
}

impl S3ObjectStore {
    /// Create a store from a loaded SDK config (its region should match
    /// `config.region`).
    pub fn new(sdk_config: &SdkConfig, config: &S3Config) -> Result<Self, StorageError> {
        Ok(Self {
            client: aws_sdk_s3::Client::new(sdk_config),
            http: download_client(config.download_timeout)?,
            bucket: config.bucket.clone(),
            locator: ObjectLocator::new(config),
        })
    }

    /// Upload an arbitrary file (the `/upload` endpoint) and return its
    /// public URL.
    pub async fn upload_file(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
        prefix: &str,
    ) -> Result<String, StorageError> {
        let key = self
            .locator
            .object_key(prefix, file_extension(filename), Utc::now());
        self.put(&key, bytes, content_type).await?;

        let url = self.locator.public_url(&key);
        tracing::info!(url = %url, filename, "Uploaded file to S3");
        Ok(url)
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                StorageError(format!(
                    "Failed to upload {key} to S3: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                StorageError(format!(
                    "Failed to download {key} from S3: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError(format!("Failed to read {key} from S3: {e}")))?;
        Ok(data.into_bytes().to_vec())
    }

}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(&self, bytes: &[u8], key_prefix: &str) -> Result<String, StorageError> {
        let key = self.locator.object_key(key_prefix, "png", Utc::now());
        self.put(&key, bytes.to_vec(), PNG_CONTENT_TYPE).await?;

        let url = self.locator.public_url(&key);
        tracing::info!(url = %url, bytes = bytes.len(), "Uploaded image to S3");
        Ok(url)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        match self.locator.bucket_key(url) {
            Some(key) => self.get(key).await,
            None => fetch_url(&self.http, url).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
