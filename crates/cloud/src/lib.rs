//! AWS plumbing for the image worker.
//!
//! - [`aws`]: shared credential/region loading for every AWS client.
//! - [`s3`]: [`S3ObjectStore`], the S3-backed
//!   [`ObjectStore`](stolink_core::providers::ObjectStore).

pub mod aws;
pub mod s3;

pub use aws::AwsCredentials;
pub use s3::{download_client, fetch_url, ObjectLocator, S3Config, S3ObjectStore};
