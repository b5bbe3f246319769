//! Human-readable item metadata used to label item identifiers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File names probed, in order, by [`find_item_metadata`].
const METADATA_FILES: [&str; 3] = ["items.yaml", "items.yml", "items.json"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Loads a list of item metadata from a YAML or JSON file, chosen by extension.
///
/// # Errors
///
/// Returns an error for unknown extensions, unreadable files, or bad content.
pub fn load_item_metadata(path: &Path) -> Result<Vec<ItemMetadata>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("yaml" | "yml") => serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid YAML in {}", path.display())),
        Some("json") => serde_json::from_str(&contents)
            .with_context(|| format!("Invalid JSON in {}", path.display())),
        _ => anyhow::bail!(
            "Unsupported metadata format for {} (expected .yaml, .yml or .json)",
            path.display()
        ),
    }
}

/// Returns the first metadata file present in `data_dir`.
#[must_use]
pub fn find_item_metadata(data_dir: &Path) -> Option<PathBuf> {
    METADATA_FILES
        .iter()
        .map(|file| data_dir.join(file))
        .find(|path| path.is_file())
}

/// Looks up the display name of an item.
pub fn display_name<'a>(metadata: &'a [ItemMetadata], item_id: &str) -> Option<&'a str> {
    metadata
        .iter()
        .find(|item| item.id == item_id)
        .map(|item| item.name.as_str())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const YAML: &str = "\
- id: e1
  name: Gold Hoops
  category: jewelry
  style: earrings
- id: f1
  name: Trail Runner
  category: footwear
";

    #[test]
    fn test_load_yaml_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.yaml");
        fs::write(&path, YAML).unwrap();

        let items = load_item_metadata(&path).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].style.as_deref(), Some("earrings"));
        assert_eq!(items[1].style, None);
        assert_eq!(find_item_metadata(dir.path()), Some(path));
    }

    #[test]
    fn test_load_json_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        fs::write(
            &path,
            r#"[{"id": "e1", "name": "Gold Hoops", "category": "jewelry", "description": "Small"}]"#,
        )
        .unwrap();

        let items = load_item_metadata(&path).unwrap();

        assert_eq!(items[0].description.as_deref(), Some("Small"));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.toml");
        fs::write(&path, "").unwrap();

        assert!(load_item_metadata(&path).is_err());
        assert_eq!(find_item_metadata(dir.path()), None);
    }

    #[test]
    fn test_display_name() {
        let items: Vec<ItemMetadata> = serde_yaml::from_str(YAML).unwrap();

        assert_eq!(display_name(&items, "f1"), Some("Trail Runner"));
        assert_eq!(display_name(&items, "missing"), None);
    }
}
