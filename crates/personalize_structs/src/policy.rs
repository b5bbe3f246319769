//! IAM and bucket policy documents granting the service access to data.

use serde_json::{Value, json};

/// Service principal of the recommendation service.
pub const SERVICE_PRINCIPAL: &str = "personalize.amazonaws.com";

/// Managed policies attached to the service access role.
pub const ROLE_MANAGED_POLICIES: &[&str] = &[
    "arn:aws:iam::aws:policy/service-role/AmazonPersonalizeFullAccess",
    "arn:aws:iam::aws:policy/AmazonS3ReadOnlyAccess",
];

/// Bucket policy letting the service read dataset files from `bucket`.
#[must_use]
pub fn bucket_policy(bucket: &str) -> Value {
    json!({
        "Version": "2012-10-17",
        "Id": "PersonalizeS3BucketAccessPolicy",
        "Statement": [
            {
                "Sid": "PersonalizeS3BucketAccessPolicy",
                "Effect": "Allow",
                "Principal": {
                    "Service": SERVICE_PRINCIPAL
                },
                "Action": [
                    "s3:GetObject",
                    "s3:ListBucket"
                ],
                "Resource": [
                    format!("arn:aws:s3:::{bucket}"),
                    format!("arn:aws:s3:::{bucket}/*")
                ]
            }
        ]
    })
}

/// Trust policy letting the service assume the access role.
#[must_use]
pub fn role_trust_policy() -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": {
                    "Service": SERVICE_PRINCIPAL
                },
                "Action": "sts:AssumeRole"
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_policy_covers_bucket_and_objects() {
        let policy = bucket_policy("retail-data");
        let statement = &policy["Statement"][0];

        assert_eq!(statement["Principal"]["Service"], SERVICE_PRINCIPAL);
        assert_eq!(statement["Resource"][0], "arn:aws:s3:::retail-data");
        assert_eq!(statement["Resource"][1], "arn:aws:s3:::retail-data/*");
        assert_eq!(statement["Action"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_trust_policy() {
        let policy = role_trust_policy();
        assert_eq!(policy["Statement"][0]["Action"], "sts:AssumeRole");
        assert_eq!(policy["Statement"][0]["Principal"]["Service"], SERVICE_PRINCIPAL);
    }
}
