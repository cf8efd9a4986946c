//! Shared AWS SDK configuration.
//!
//! Static keys are used when both are set; otherwise the SDK's default
//! provider chain applies (instance role, profile, SSO, ...).

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;

/// Provider name recorded on statically configured credentials.
const STATIC_PROVIDER_NAME: &str = "stolink-env";

/// Optional static AWS credentials.
#[derive(Debug, Clone, Default)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl AwsCredentials {
    /// Load from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` (both may be
    /// empty).
    pub fn from_env() -> Self {
        Self {
            access_key_id: std::env::var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
            secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
        }
    }

    /// Whether both static keys are present.
    pub fn is_static(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }

    /// Build an SDK config for `region`.
    pub async fn sdk_config(&self, region: &str) -> SdkConfig {
        let loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));

        let loader = if self.is_static() {
            loader.credentials_provider(Credentials::new(
                self.access_key_id.clone(),
                self.secret_access_key.clone(),
                None,
                None,
                STATIC_PROVIDER_NAME,
            ))
        } else {
            tracing::info!(region, "No static AWS keys, using default credential chain");
            loader
        };

        loader.load().await
    }
}
