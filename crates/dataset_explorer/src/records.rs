//! Typed rows of the three input CSV files.

use std::path::Path;

use anyhow::{Context, Result};
use personalize_structs::DatasetType;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// One row of `interactions.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Interaction {
    pub user_id: String,
    pub item_id: String,
    pub event_type: String,
    /// Epoch seconds
    pub timestamp: i64,
    pub discount: String,
}

/// One row of `items.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Item {
    pub item_id: String,
    pub category: String,
    pub style: String,
    pub description: String,
}

/// One row of `users.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct User {
    pub user_id: String,
    pub age: u32,
    pub gender: String,
}

fn load_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    reader
        .deserialize::<T>()
        .enumerate()
        .map(|(index, row)| {
            // Header is line 1
            row.with_context(|| format!("{}: bad row at line {}", path.display(), index + 2))
        })
        .collect()
}

/// # Errors
///
/// Returns an error if the file cannot be read or a row does not parse.
pub fn load_interactions(path: &Path) -> Result<Vec<Interaction>> {
    load_rows(path)
}

/// # Errors
///
/// Returns an error if the file cannot be read or a row does not parse.
pub fn load_items(path: &Path) -> Result<Vec<Item>> {
    load_rows(path)
}

/// # Errors
///
/// Returns an error if the file cannot be read or a row does not parse.
pub fn load_users(path: &Path) -> Result<Vec<User>> {
    load_rows(path)
}

/// Checks that the CSV header carries every column the dataset requires.
///
/// Extra columns are allowed.
///
/// # Errors
///
/// Returns an error listing the missing columns, or if the header cannot be read.
pub fn validate_headers(dataset_type: DatasetType, path: &Path) -> Result<()> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?;

    let missing: Vec<&str> = dataset_type
        .required_columns()
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|header| header.trim() == *column))
        .collect();

    if !missing.is_empty() {
        anyhow::bail!(
            "{} is missing {} columns: {} (found: {})",
            path.display(),
            dataset_type,
            missing.join(", "),
            headers.iter().collect::<Vec<_>>().join(", ")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn test_load_interactions() {
        let file = csv_file(
            "USER_ID,ITEM_ID,EVENT_TYPE,TIMESTAMP,DISCOUNT\n\
             u1,i1,ProductViewed,1591803788,No\n\
             u1,i2,OrderCompleted,1591803790,Yes\n",
        );

        let rows = load_interactions(file.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].event_type, "OrderCompleted");
        assert_eq!(rows[1].timestamp, 1_591_803_790);
    }

    #[test]
    fn test_load_users_reports_bad_line() {
        let file = csv_file("USER_ID,AGE,GENDER\n1,31,F\n2,unknown,M\n");

        let error = load_users(file.path()).unwrap_err();

        assert!(format!("{error:#}").contains("line 3"));
    }

    #[test]
    fn test_load_items() {
        let file = csv_file(
            "ITEM_ID,CATEGORY,STYLE,DESCRIPTION\n\
             e1,jewelry,earrings,\"Gold hoops, small\"\n",
        );

        let rows = load_items(file.path()).unwrap();

        assert_eq!(rows[0].description, "Gold hoops, small");
    }

    #[test]
    fn test_validate_headers() {
        let good = csv_file("USER_ID,AGE,GENDER,EXTRA\n1,20,F,x\n");
        let bad = csv_file("USER_ID,GENDER\n1,F\n");

        assert!(validate_headers(DatasetType::Users, good.path()).is_ok());

        let error = validate_headers(DatasetType::Users, bad.path()).unwrap_err();
        assert!(error.to_string().contains("AGE"));
    }

    #[test]
    fn test_validate_headers_missing_file() {
        assert!(validate_headers(DatasetType::Items, Path::new("/nonexistent/items.csv")).is_err());
    }
}
