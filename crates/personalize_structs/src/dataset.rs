use core::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// The three dataset roles a dataset group can hold.
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
    strum::EnumIter,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DatasetType {
    Interactions,
    Items,
    Users,
}

impl DatasetType {
    /// Iterates over all dataset types in creation order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Returns the value the service expects for `datasetType`.
    #[must_use]
    pub const fn as_api_string(self) -> &'static str {
        match self {
            Self::Interactions => "INTERACTIONS",
            Self::Items => "ITEMS",
            Self::Users => "USERS",
        }
    }

    /// Returns the lower-case slug used in resource names and state keys.
    #[must_use]
    pub const fn as_slug(self) -> &'static str {
        match self {
            Self::Interactions => "interactions",
            Self::Items => "items",
            Self::Users => "users",
        }
    }

    /// Returns the local CSV file name holding this dataset.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Interactions => "interactions.csv",
            Self::Items => "items.csv",
            Self::Users => "users.csv",
        }
    }

    /// Returns the columns the CSV file must contain.
    #[must_use]
    pub const fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::Interactions => &["ITEM_ID", "USER_ID", "EVENT_TYPE", "TIMESTAMP", "DISCOUNT"],
            Self::Items => &["ITEM_ID", "CATEGORY", "STYLE", "DESCRIPTION"],
            Self::Users => &["USER_ID", "AGE", "GENDER"],
        }
    }
}

impl FromStr for DatasetType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "interactions" => Ok(Self::Interactions),
            "items" => Ok(Self::Items),
            "users" => Ok(Self::Users),
            _ => Err(anyhow::anyhow!("Invalid dataset type: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_in_creation_order() {
        let all: Vec<_> = DatasetType::all().collect();
        assert_eq!(
            all,
            vec![DatasetType::Interactions, DatasetType::Items, DatasetType::Users]
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!("ITEMS".parse::<DatasetType>().unwrap(), DatasetType::Items);
        assert_eq!("users".parse::<DatasetType>().unwrap(), DatasetType::Users);
        assert!("events".parse::<DatasetType>().is_err());
    }

    #[test]
    fn test_required_columns() {
        assert!(DatasetType::Interactions.required_columns().contains(&"DISCOUNT"));
        assert_eq!(DatasetType::Users.required_columns().len(), 3);
    }
}
