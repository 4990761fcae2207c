//! Terminal rendering of tables.
//!
//! Large tables are truncated in the middle unless the corresponding
//! [`DisplayOptions`] toggle asks for everything. Rendering never touches the
//! table's data.

use crate::types::{DisplayOptions, Table};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, ContentArrangement};
use serde_json::Value;
use std::fmt;

/// Rows shown before truncation kicks in
pub const MAX_ROWS: usize = 60;
/// Rows kept at each end of a truncated table
pub const EDGE_ROWS: usize = 5;
/// Columns shown before truncation kicks in
pub const MAX_COLUMNS: usize = 20;
/// Columns kept at each side of a truncated table
pub const EDGE_COLUMNS: usize = 10;

const ELLIPSIS: &str = "...";

impl Table {
    pub fn display(&self, options: DisplayOptions) -> TableDisplay<'_> {
        TableDisplay {
            table: self,
            options,
        }
    }
}

/// Borrowed view of a table implementing [`fmt::Display`]
pub struct TableDisplay<'a> {
    table: &'a Table,
    options: DisplayOptions,
}

/// Positions to render, with `None` marking the elided gap
fn visible(total: usize, limit: usize, edge: usize, show_all: bool) -> Vec<Option<usize>> {
    if show_all || total <= limit {
        return (0..total).map(Some).collect();
    }
    (0..edge)
        .map(Some)
        .chain(std::iter::once(None))
        .chain((total - edge..total).map(Some))
        .collect()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::from("null"),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl TableDisplay<'_> {
    fn build(&self) -> comfy_table::Table {
        let table = self.table;
        let columns = visible(
            table.num_columns(),
            MAX_COLUMNS,
            EDGE_COLUMNS,
            self.options.show_all_columns,
        );
        let rows = visible(table.len(), MAX_ROWS, EDGE_ROWS, self.options.show_all_rows);

        let mut rendered = comfy_table::Table::new();
        rendered
            .load_preset(UTF8_FULL_CONDENSED)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_content_arrangement(ContentArrangement::Disabled);

        rendered.set_header(std::iter::once(Cell::new("")).chain(columns.iter().map(|c| {
            match c {
                Some(p) => Cell::new(&table.columns()[*p]),
                None => Cell::new(ELLIPSIS),
            }
        })));

        for r in &rows {
            let cells: Vec<Cell> = match r {
                Some(row) => std::iter::once(Cell::new(table.index()[*row]))
                    .chain(columns.iter().map(|c| match c {
                        Some(p) => Cell::new(cell_text(&table.rows()[*row][*p])),
                        None => Cell::new(ELLIPSIS),
                    }))
                    .collect(),
                None => vec![Cell::new(ELLIPSIS); columns.len() + 1],
            };
            rendered.add_row(cells);
        }

        if let Some(index_column) = rendered.column_mut(0) {
            index_column.set_cell_alignment(CellAlignment::Right);
        }
        rendered
    }
}

impl fmt::Display for TableDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.build())?;
        write!(f, "[{} rows x {} columns]", self.table.len(), self.table.num_columns())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::records_to_table;
    use serde_json::json;

    #[test]
    fn test_small_table_renders_everything() {
        let table = records_to_table(vec![
            json!({"id": 1, "name": "Alice"}),
            json!({"id": 2, "name": null}),
        ]);

        let text = table.display(DisplayOptions::default()).to_string();
        assert!(text.contains("name"));
        assert!(text.contains("Alice"));
        assert!(text.contains("null"));
        assert!(!text.contains(ELLIPSIS));
        assert!(text.ends_with("[2 rows x 2 columns]"));
    }

    #[test]
    fn test_long_table_is_truncated() {
        let records = (0..100).map(|i| json!({"n": i})).collect();
        let table = records_to_table(records);

        let text = table.display(DisplayOptions::default()).to_string();
        assert!(text.contains(ELLIPSIS));
        assert!(text.contains(" 99 "));
        assert!(!text.contains(" 50 "));

        let full = table
            .display(DisplayOptions {
                show_all_rows: true,
                show_all_columns: false,
            })
            .to_string();
        assert!(!full.contains(ELLIPSIS));
        assert!(full.contains(" 50 "));
        assert!(full.ends_with("[100 rows x 1 columns]"));
    }

    #[test]
    fn test_wide_table_is_truncated() {
        let mut record = serde_json::Map::new();
        for i in 0..30 {
            record.insert(format!("c{}", i), json!(i));
        }
        let table = records_to_table(vec![serde_json::Value::Object(record)]);

        let text = table.display(DisplayOptions::default()).to_string();
        assert!(!text.contains("c15"));
        assert!(text.contains("c29"));
        assert!(text.ends_with("[1 rows x 30 columns]"));

        let all = table
            .display(DisplayOptions {
                show_all_rows: false,
                show_all_columns: true,
            })
            .to_string();
        assert!(all.contains("c15"));
    }
}
