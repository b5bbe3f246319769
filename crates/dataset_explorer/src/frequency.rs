//! Categorical frequency counts and their text chart.

use std::collections::HashMap;

use comfy_table::{CellAlignment, ContentArrangement, Table};

const BAR_WIDTH: usize = 40;

/// Counts occurrences of each value, sorted by count (descending) then value.
pub fn frequency<I, S>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values {
        *counts.entry(value.as_ref().to_string()).or_default() += 1;
    }

    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|(a_key, a_count), (b_key, b_count)| {
        b_count.cmp(a_count).then_with(|| a_key.cmp(b_key))
    });
    counts
}

/// Renders counts as a table with a share column and a proportional bar.
#[must_use]
pub fn render_frequency_table(title: &str, counts: &[(String, usize)]) -> Table {
    let total: usize = counts.iter().map(|(_, count)| count).sum();
    let max = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![title.to_uppercase(), "COUNT".to_string(), "SHARE".to_string(), String::new()]);

    for (value, count) in counts {
        let share = if total == 0 {
            0.0
        } else {
            *count as f64 * 100.0 / total as f64
        };
        let bar_len = if max == 0 { 0 } else { count * BAR_WIDTH / max };

        table.add_row(vec![
            value.clone(),
            count.to_string(),
            format!("{share:.1}%"),
            "█".repeat(bar_len.max(1)),
        ]);
    }

    for index in 1..=2 {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_orders_by_count_then_value() {
        let counts = frequency(["b", "a", "c", "a", "b", "a", "d", "c"]);

        assert_eq!(
            counts,
            vec![
                ("a".to_string(), 3),
                ("b".to_string(), 2),
                ("c".to_string(), 2),
                ("d".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_frequency_empty() {
        assert!(frequency(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_render_frequency_table() {
        let counts = frequency(["ProductViewed", "ProductViewed", "ProductViewed", "OrderCompleted"]);

        let rendered = render_frequency_table("event type", &counts).to_string();

        assert!(rendered.contains("EVENT TYPE"));
        assert!(rendered.contains("ProductViewed"));
        assert!(rendered.contains("75.0%"));
        assert!(rendered.contains(&"█".repeat(BAR_WIDTH)));
        assert!(rendered.contains(&"█".repeat(BAR_WIDTH / 3)));
    }
}
