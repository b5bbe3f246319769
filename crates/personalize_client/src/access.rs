//! Bucket and role provisioning so the service can read dataset files.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult, classify};

/// Region whose buckets are created without a location constraint.
const DEFAULT_BUCKET_REGION: &str = "us-east-1";

/// The access role the service assumes during imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleHandle {
    pub arn: String,
    /// False when the role already existed
    pub created: bool,
}

/// Storage and identity operations the data stage needs.
#[async_trait]
pub trait AccessProvisioner: Send + Sync {
    /// Creates the bucket unless it already exists.
    async fn ensure_bucket(&self, bucket: &str) -> ApiResult<()>;

    /// Replaces the bucket policy.
    async fn put_bucket_policy(&self, bucket: &str, policy: &Value) -> ApiResult<()>;

    /// Creates the role (or looks it up) and attaches the managed policies.
    async fn ensure_role(
        &self,
        role_name: &str,
        trust_policy: &Value,
        managed_policies: &[&str],
    ) -> ApiResult<RoleHandle>;
}

/// [`AccessProvisioner`] backed by S3 and IAM.
pub struct AwsAccessProvisioner {
    s3: aws_sdk_s3::Client,
    iam: aws_sdk_iam::Client,
    region: Option<String>,
}

impl AwsAccessProvisioner {
    #[must_use]
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            s3: aws_sdk_s3::Client::new(sdk_config),
            iam: aws_sdk_iam::Client::new(sdk_config),
            region: sdk_config.region().map(ToString::to_string),
        }
    }

    async fn find_role_arn(&self, role_name: &str) -> ApiResult<String> {
        let output = self
            .iam
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(classify)?;

        output
            .role()
            .map(|role| role.arn().to_string())
            .ok_or(ApiError::MissingField("Role"))
    }
}

#[async_trait]
impl AccessProvisioner for AwsAccessProvisioner {
    async fn ensure_bucket(&self, bucket: &str) -> ApiResult<()> {
        match self.s3.head_bucket().bucket(bucket).send().await.map_err(classify) {
            Ok(_) => {
                info!(bucket, "Bucket exists");
                return Ok(());
            }
            Err(ApiError::NotFound(_)) => {}
            Err(error) => return Err(error),
        }

        let mut request = self.s3.create_bucket().bucket(bucket);

        if let Some(region) = self.region.as_deref()
            && region != DEFAULT_BUCKET_REGION
        {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        match request.send().await.map_err(classify) {
            Ok(_) => {
                info!(bucket, "Created bucket");
                Ok(())
            }
            Err(ApiError::AlreadyExists(_)) => Ok(()),
            Err(error) => Err(error),
        }
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &Value) -> ApiResult<()> {
        self.s3
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy.to_string())
            .send()
            .await
            .map_err(classify)?;

        info!(bucket, "Bucket policy applied");

        Ok(())
    }

    async fn ensure_role(
        &self,
        role_name: &str,
        trust_policy: &Value,
        managed_policies: &[&str],
    ) -> ApiResult<RoleHandle> {
        let created = self
            .iam
            .create_role()
            .role_name(role_name)
            .assume_role_policy_document(trust_policy.to_string())
            .send()
            .await
            .map_err(classify);

        let handle = match created {
            Ok(output) => RoleHandle {
                arn: output
                    .role()
                    .map(|role| role.arn().to_string())
                    .ok_or(ApiError::MissingField("Role"))?,
                created: true,
            },
            Err(ApiError::AlreadyExists(_)) => {
                warn!(role_name, "Role already exists, reusing it");
                RoleHandle {
                    arn: self.find_role_arn(role_name).await?,
                    created: false,
                }
            }
            Err(error) => return Err(error),
        };

        // Attaching an already attached policy is a no-op.
        for policy_arn in managed_policies {
            self.iam
                .attach_role_policy()
                .role_name(role_name)
                .policy_arn(*policy_arn)
                .send()
                .await
                .map_err(classify)?;
        }

        info!(role_name, arn = %handle.arn, created = handle.created, "Access role ready");

        Ok(handle)
    }
}
