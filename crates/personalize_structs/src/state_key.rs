//! Names of the identifiers persisted between the setup stages.

use core::fmt;
use core::str::FromStr;

use crate::{DatasetType, Recipe, ResourceKind};

/// Logical name under which a resource identifier is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateKey {
    DatasetGroup,
    Schema(DatasetType),
    Dataset(DatasetType),
    ImportJob(DatasetType),
    Role,
    Solution(Recipe),
    SolutionVersion(Recipe),
    Campaign(Recipe),
    Filter,
}

impl StateKey {
    /// Returns the kind of resource stored under this key.
    #[must_use]
    pub const fn kind(self) -> ResourceKind {
        match self {
            Self::DatasetGroup => ResourceKind::DatasetGroup,
            Self::Schema(_) => ResourceKind::Schema,
            Self::Dataset(_) => ResourceKind::Dataset,
            Self::ImportJob(_) => ResourceKind::DatasetImportJob,
            Self::Role => ResourceKind::Role,
            Self::Solution(_) => ResourceKind::Solution,
            Self::SolutionVersion(_) => ResourceKind::SolutionVersion,
            Self::Campaign(_) => ResourceKind::Campaign,
            Self::Filter => ResourceKind::Filter,
        }
    }

    /// Returns the CLI stage that writes this key.
    #[must_use]
    pub const fn written_by(self) -> &'static str {
        match self {
            Self::DatasetGroup
            | Self::Schema(_)
            | Self::Dataset(_)
            | Self::ImportJob(_)
            | Self::Role => "data-layer",
            Self::Solution(_) | Self::SolutionVersion(_) | Self::Campaign(_) | Self::Filter => {
                "training-layer"
            }
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DatasetGroup => f.write_str("dataset_group"),
            Self::Schema(dataset) => write!(f, "schema/{}", dataset.as_slug()),
            Self::Dataset(dataset) => write!(f, "dataset/{}", dataset.as_slug()),
            Self::ImportJob(dataset) => write!(f, "import_job/{}", dataset.as_slug()),
            Self::Role => f.write_str("role"),
            Self::Solution(recipe) => write!(f, "solution/{}", recipe.as_slug()),
            Self::SolutionVersion(recipe) => write!(f, "solution_version/{}", recipe.as_slug()),
            Self::Campaign(recipe) => write!(f, "campaign/{}", recipe.as_slug()),
            Self::Filter => f.write_str("filter"),
        }
    }
}

impl FromStr for StateKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "dataset_group" => return Ok(Self::DatasetGroup),
            "role" => return Ok(Self::Role),
            "filter" => return Ok(Self::Filter),
            _ => {}
        }

        let (prefix, rest) = s
            .split_once('/')
            .ok_or_else(|| anyhow::anyhow!("Invalid state key: {s}"))?;

        match prefix {
            "schema" => Ok(Self::Schema(rest.parse()?)),
            "dataset" => Ok(Self::Dataset(rest.parse()?)),
            "import_job" => Ok(Self::ImportJob(rest.parse()?)),
            "solution" => Ok(Self::Solution(rest.parse()?)),
            "solution_version" => Ok(Self::SolutionVersion(rest.parse()?)),
            "campaign" => Ok(Self::Campaign(rest.parse()?)),
            _ => Err(anyhow::anyhow!("Invalid state key: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(StateKey::DatasetGroup.to_string(), "dataset_group");
        assert_eq!(
            StateKey::ImportJob(DatasetType::Items).to_string(),
            "import_job/items"
        );
        assert_eq!(
            StateKey::Campaign(Recipe::UserPersonalization).to_string(),
            "campaign/user-personalization"
        );
    }

    #[test]
    fn test_parse_back() {
        for key in [
            StateKey::DatasetGroup,
            StateKey::Role,
            StateKey::Filter,
            StateKey::Schema(DatasetType::Users),
            StateKey::SolutionVersion(Recipe::PersonalizedRanking),
        ] {
            assert_eq!(key.to_string().parse::<StateKey>().unwrap(), key);
        }
        assert!("campaign/unknown".parse::<StateKey>().is_err());
        assert!("nothing".parse::<StateKey>().is_err());
    }

    #[test]
    fn test_written_by() {
        assert_eq!(StateKey::Dataset(DatasetType::Items).written_by(), "data-layer");
        assert_eq!(StateKey::Filter.written_by(), "training-layer");
        assert_eq!(StateKey::Solution(Recipe::Sims).kind(), ResourceKind::Solution);
    }
}
