//! Local dataset exploration: CSV loading, header checks, categorical
//! frequency charts and item display names.

mod frequency;
mod metadata;
mod records;
mod summary;

pub use frequency::{frequency, render_frequency_table};
pub use metadata::{ItemMetadata, display_name, find_item_metadata, load_item_metadata};
pub use records::{Interaction, Item, User, load_interactions, load_items, load_users, validate_headers};
pub use summary::{DatasetSummary, summarize};
