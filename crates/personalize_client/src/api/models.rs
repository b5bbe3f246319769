//! Request and response types for the recommendation service.

use personalize_structs::{
    DatasetSchema, DatasetType, FilterExpression, Recipe, ResourceKind, ResourceStatus,
};

/// A create call for one resource.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateRequest {
    Schema {
        name: String,
        schema: DatasetSchema,
    },
    DatasetGroup {
        name: String,
    },
    Dataset {
        name: String,
        dataset_group_arn: String,
        schema_arn: String,
        dataset_type: DatasetType,
    },
    DatasetImportJob {
        name: String,
        dataset_arn: String,
        /// `s3://bucket/key` of the file to import
        data_location: String,
        role_arn: String,
    },
    Solution {
        name: String,
        dataset_group_arn: String,
        recipe: Recipe,
    },
    SolutionVersion {
        solution_arn: String,
    },
    Campaign {
        name: String,
        solution_version_arn: String,
        min_provisioned_tps: i32,
    },
    Filter {
        name: String,
        dataset_group_arn: String,
        expression: FilterExpression,
    },
}

impl CreateRequest {
    /// Returns the kind of resource this request creates.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Schema { .. } => ResourceKind::Schema,
            Self::DatasetGroup { .. } => ResourceKind::DatasetGroup,
            Self::Dataset { .. } => ResourceKind::Dataset,
            Self::DatasetImportJob { .. } => ResourceKind::DatasetImportJob,
            Self::Solution { .. } => ResourceKind::Solution,
            Self::SolutionVersion { .. } => ResourceKind::SolutionVersion,
            Self::Campaign { .. } => ResourceKind::Campaign,
            Self::Filter { .. } => ResourceKind::Filter,
        }
    }

    /// Returns the name the resource is created under.
    ///
    /// Solution versions are unnamed and use their solution's ARN.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Schema { name, .. }
            | Self::DatasetGroup { name }
            | Self::Dataset { name, .. }
            | Self::DatasetImportJob { name, .. }
            | Self::Solution { name, .. }
            | Self::Campaign { name, .. }
            | Self::Filter { name, .. } => name,
            Self::SolutionVersion { solution_arn } => solution_arn,
        }
    }

    /// Returns the parent resource whose listing contains this resource.
    ///
    /// `None` means the resource is listed account-wide.
    #[must_use]
    pub fn parent_arn(&self) -> Option<&str> {
        match self {
            Self::Schema { .. } | Self::DatasetGroup { .. } => None,
            Self::Dataset {
                dataset_group_arn, ..
            }
            | Self::Solution {
                dataset_group_arn, ..
            }
            | Self::Filter {
                dataset_group_arn, ..
            } => Some(dataset_group_arn),
            Self::DatasetImportJob { dataset_arn, .. } => Some(dataset_arn),
            Self::SolutionVersion { solution_arn } => Some(solution_arn),
            // Campaigns are listed per solution; the version ARN extends it.
            Self::Campaign {
                solution_version_arn,
                ..
            } => Some(solution_arn_of_version(solution_version_arn)),
        }
    }
}

/// Strips the trailing version id from a solution version ARN.
///
/// `arn:…:solution/name/abc123` becomes `arn:…:solution/name`.
#[must_use]
pub fn solution_arn_of_version(solution_version_arn: &str) -> &str {
    solution_version_arn
        .rsplit_once('/')
        .filter(|(head, _)| head.contains(":solution/"))
        .map_or(solution_version_arn, |(head, _)| head)
}

/// One entry of a list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSummary {
    pub name: String,
    pub arn: String,
    pub status: Option<ResourceStatus>,
    /// Creation time in epoch seconds, when the listing reports it
    pub created_at: Option<i64>,
}

impl ResourceSummary {
    #[must_use]
    pub fn new(name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: arn.into(),
            status: None,
            created_at: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub const fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = Some(created_at);
        self
    }
}
