//! Database model types.

use chrono::{DateTime, Utc};
use personalize_structs::{ResourceKind, ResourceStatus, StateKey};

/// A remote resource identifier persisted by one of the stages.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResourceRecord {
    pub key: String,
    pub kind: ResourceKind,
    pub name: String,
    pub arn: String,
    pub status: Option<String>,
    pub details: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceRecord {
    /// Parses the stored key back into a typed state key.
    ///
    /// # Errors
    ///
    /// Returns an error if the row holds a key this version does not know.
    pub fn state_key(&self) -> anyhow::Result<StateKey> {
        self.key.parse()
    }

    /// Returns the last recorded status, if any.
    #[must_use]
    pub fn resource_status(&self) -> Option<ResourceStatus> {
        self.status.as_deref().map(ResourceStatus::from_api_string)
    }

    /// Parses the stored JSON details, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored details are not valid JSON.
    pub fn details_json(&self) -> serde_json::Result<Option<serde_json::Value>> {
        self.details.as_deref().map(serde_json::from_str).transpose()
    }
}

/// Input for recording a resource identifier.
#[derive(Debug, Clone)]
pub struct NewResource {
    pub key: StateKey,
    pub name: String,
    pub arn: String,
    pub status: Option<ResourceStatus>,
}

impl NewResource {
    #[must_use]
    pub fn new(key: StateKey, name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            arn: arn.into(),
            status: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = Some(status);
        self
    }
}
