//! The recommendation service API seam.

pub mod client;
pub mod models;

use std::collections::BTreeMap;

use async_trait::async_trait;
use personalize_structs::{ResourceKind, ResourceState};

use crate::error::ApiResult;
use models::{CreateRequest, ResourceSummary};

/// Operations the setup stages need from the recommendation service.
#[async_trait]
pub trait PersonalizeApi: Send + Sync {
    /// Issues a create call and returns the new resource's ARN.
    ///
    /// Fails with [`crate::ApiError::AlreadyExists`] if the name is taken.
    async fn create(&self, request: &CreateRequest) -> ApiResult<String>;

    /// Reads the current status of a resource.
    async fn describe(&self, kind: ResourceKind, arn: &str) -> ApiResult<ResourceState>;

    /// Lists resources of a kind under a parent (account-wide if `None`).
    async fn list(&self, kind: ResourceKind, parent_arn: Option<&str>)
    -> ApiResult<Vec<ResourceSummary>>;

    /// Fetches offline evaluation metrics of a trained solution version.
    async fn solution_metrics(&self, solution_version_arn: &str) -> ApiResult<BTreeMap<String, f64>>;
}
