//! Client for the managed recommendation service.
//!
//! Wraps the service API behind the [`PersonalizeApi`] trait, with rate
//! limiting and retry on throttling, and provisions the bucket and role the
//! service needs to read dataset files.

pub mod access;
pub mod api;
pub mod error;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
mod upload;

pub use access::{AccessProvisioner, AwsAccessProvisioner, RoleHandle};
pub use api::client::AwsPersonalizeClient;
pub use api::models::{CreateRequest, ResourceSummary};
pub use api::PersonalizeApi;
pub use error::{ApiError, ApiResult};
pub use upload::{s3_uri, upload_file};

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Loads the shared AWS SDK configuration, overriding the region if given.
pub async fn load_sdk_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }

    loader.load().await
}
