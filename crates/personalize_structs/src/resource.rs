//! Remote resource kinds and their lifecycle status.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Kind of remote resource managed by the setup stages.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceKind {
    Schema,
    DatasetGroup,
    Dataset,
    DatasetImportJob,
    Solution,
    SolutionVersion,
    Campaign,
    Filter,
    Role,
}

impl ResourceKind {
    /// Returns true if creation returns before the resource is usable.
    ///
    /// Schemas are created synchronously, and roles live outside the
    /// recommendation service.
    #[must_use]
    pub const fn is_async(self) -> bool {
        !matches!(self, Self::Schema | Self::Role)
    }
}

/// Lifecycle status reported by a describe call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ResourceStatus {
    CreatePending,
    CreateInProgress,
    Active,
    CreateFailed,
    DeletePending,
    DeleteInProgress,
    /// Any status string the service adds later.
    Other(String),
}

impl ResourceStatus {
    /// Parses the service's status vocabulary.
    #[must_use]
    pub fn from_api_string(s: &str) -> Self {
        match s.trim().to_uppercase().replace('_', " ").as_str() {
            "CREATE PENDING" => Self::CreatePending,
            "CREATE IN PROGRESS" => Self::CreateInProgress,
            "ACTIVE" => Self::Active,
            "CREATE FAILED" => Self::CreateFailed,
            "DELETE PENDING" => Self::DeletePending,
            "DELETE IN PROGRESS" => Self::DeleteInProgress,
            _ => Self::Other(s.to_string()),
        }
    }

    /// Returns the status as the service spells it.
    #[must_use]
    pub fn as_api_string(&self) -> &str {
        match self {
            Self::CreatePending => "CREATE PENDING",
            Self::CreateInProgress => "CREATE IN_PROGRESS",
            Self::Active => "ACTIVE",
            Self::CreateFailed => "CREATE FAILED",
            Self::DeletePending => "DELETE PENDING",
            Self::DeleteInProgress => "DELETE IN_PROGRESS",
            Self::Other(raw) => raw,
        }
    }

    /// `ACTIVE` and `CREATE FAILED` end the creation lifecycle.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Active | Self::CreateFailed)
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_string())
    }
}

impl From<String> for ResourceStatus {
    fn from(value: String) -> Self {
        Self::from_api_string(&value)
    }
}

impl From<ResourceStatus> for String {
    fn from(value: ResourceStatus) -> Self {
        value.as_api_string().to_string()
    }
}

/// Snapshot of a resource returned by a describe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceState {
    pub status: ResourceStatus,
    pub failure_reason: Option<String>,
}

impl ResourceState {
    #[must_use]
    pub const fn new(status: ResourceStatus) -> Self {
        Self {
            status,
            failure_reason: None,
        }
    }

    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: ResourceStatus::CreateFailed,
            failure_reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(ResourceStatus::from_api_string("ACTIVE"), ResourceStatus::Active);
        assert_eq!(
            ResourceStatus::from_api_string("CREATE IN_PROGRESS"),
            ResourceStatus::CreateInProgress
        );
        assert_eq!(
            ResourceStatus::from_api_string("CREATE FAILED"),
            ResourceStatus::CreateFailed
        );
        assert_eq!(
            ResourceStatus::from_api_string("CREATE STOPPING"),
            ResourceStatus::Other("CREATE STOPPING".to_string())
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ResourceStatus::Active.is_terminal());
        assert!(ResourceStatus::CreateFailed.is_terminal());
        assert!(!ResourceStatus::CreatePending.is_terminal());
        assert!(!ResourceStatus::CreateInProgress.is_terminal());
        assert!(!ResourceStatus::Other("UPDATE PENDING".to_string()).is_terminal());
    }

    #[test]
    fn test_status_round_trips_through_api_string() {
        let status = ResourceStatus::CreateInProgress;
        assert_eq!(ResourceStatus::from_api_string(status.as_api_string()), status);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(
            "dataset_import_job".parse::<ResourceKind>().unwrap(),
            ResourceKind::DatasetImportJob
        );
        assert_eq!(ResourceKind::SolutionVersion.to_string(), "solution_version");
        assert!(!ResourceKind::Schema.is_async());
        assert!(ResourceKind::Campaign.is_async());
    }
}
