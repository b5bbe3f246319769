//! Overview of the local data directory, printed by the `explore` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{ContentArrangement, Table};
use personalize_structs::DatasetType;
use tracing::{debug, info};

use crate::frequency::{frequency, render_frequency_table};
use crate::metadata::{display_name, find_item_metadata, load_item_metadata};
use crate::records::{load_interactions, load_items, load_users, validate_headers};

const TOP_ITEMS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSummary {
    pub interactions: usize,
    pub items: usize,
    pub users: usize,
    pub event_types: Vec<(String, usize)>,
    pub categories: Vec<(String, usize)>,
    pub genders: Vec<(String, usize)>,
    /// Most interacted items, labelled with their display name when known
    pub top_items: Vec<(String, usize)>,
}

impl DatasetSummary {
    /// Row counts followed by one frequency chart per categorical column.
    #[must_use]
    pub fn tables(&self) -> Vec<Table> {
        let mut counts = Table::new();
        counts.set_content_arrangement(ContentArrangement::Dynamic);
        counts.set_header(vec!["DATASET", "ROWS"]);
        counts.add_row(vec![DatasetType::Interactions.to_string(), self.interactions.to_string()]);
        counts.add_row(vec![DatasetType::Items.to_string(), self.items.to_string()]);
        counts.add_row(vec![DatasetType::Users.to_string(), self.users.to_string()]);

        vec![
            counts,
            render_frequency_table("event type", &self.event_types),
            render_frequency_table("category", &self.categories),
            render_frequency_table("gender", &self.genders),
            render_frequency_table("top items", &self.top_items),
        ]
    }
}

/// Loads the three CSV files in `data_dir` and summarizes them.
///
/// Item metadata (`items.yaml`, `items.yml` or `items.json`) is optional and
/// only used to label the most interacted items.
///
/// # Errors
///
/// Returns an error if a CSV file is missing, lacks a required column, or
/// does not parse.
pub fn summarize(data_dir: &Path) -> Result<DatasetSummary> {
    for dataset_type in DatasetType::all() {
        validate_headers(dataset_type, &data_dir.join(dataset_type.file_name()))?;
    }

    let interactions = load_interactions(&data_dir.join(DatasetType::Interactions.file_name()))?;
    let items = load_items(&data_dir.join(DatasetType::Items.file_name()))?;
    let users = load_users(&data_dir.join(DatasetType::Users.file_name()))?;

    let metadata = match find_item_metadata(data_dir) {
        Some(path) => {
            debug!(path = %path.display(), "Loading item metadata");
            load_item_metadata(&path)?
        }
        None => Vec::new(),
    };

    let top_items = frequency(interactions.iter().map(|row| &row.item_id))
        .into_iter()
        .take(TOP_ITEMS)
        .map(|(item_id, count)| {
            let label = display_name(&metadata, &item_id)
                .map_or_else(|| item_id.clone(), |name| format!("{name} ({item_id})"));
            (label, count)
        })
        .collect();

    let summary = DatasetSummary {
        interactions: interactions.len(),
        items: items.len(),
        users: users.len(),
        event_types: frequency(interactions.iter().map(|row| &row.event_type)),
        categories: frequency(items.iter().map(|row| &row.category)),
        genders: frequency(users.iter().map(|row| &row.gender)),
        top_items,
    };

    info!(
        interactions = summary.interactions,
        items = summary.items,
        users = summary.users,
        "Summarized local datasets"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write_data_dir(dir: &Path) {
        fs::write(
            dir.join("interactions.csv"),
            "USER_ID,ITEM_ID,EVENT_TYPE,TIMESTAMP,DISCOUNT\n\
             u1,e1,ProductViewed,1,No\n\
             u2,e1,OrderCompleted,2,Yes\n\
             u2,f1,ProductViewed,3,No\n",
        )
        .unwrap();
        fs::write(
            dir.join("items.csv"),
            "ITEM_ID,CATEGORY,STYLE,DESCRIPTION\ne1,jewelry,earrings,Hoops\nf1,footwear,sneaker,Runner\n",
        )
        .unwrap();
        fs::write(dir.join("users.csv"), "USER_ID,AGE,GENDER\nu1,30,F\nu2,41,M\n").unwrap();
    }

    #[test]
    fn test_summarize() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path());
        fs::write(
            dir.path().join("items.yaml"),
            "- id: e1\n  name: Gold Hoops\n  category: jewelry\n",
        )
        .unwrap();

        let summary = summarize(dir.path()).unwrap();

        assert_eq!(summary.interactions, 3);
        assert_eq!(summary.items, 2);
        assert_eq!(summary.users, 2);
        assert_eq!(summary.event_types[0], ("ProductViewed".to_string(), 2));
        assert_eq!(
            summary.top_items,
            vec![("Gold Hoops (e1)".to_string(), 2), ("f1".to_string(), 1)]
        );
        assert_eq!(summary.tables().len(), 5);
    }

    #[test]
    fn test_summarize_rejects_bad_header() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path());
        fs::write(dir.path().join("users.csv"), "USER_ID,GENDER\nu1,F\n").unwrap();

        assert!(summarize(dir.path()).is_err());
    }
}
