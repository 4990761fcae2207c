use crate::error::{Result, StageError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A row-oriented table of JSON cells.
///
/// Cells line up with `columns`; a key that was absent from the source record
/// is stored as `Value::Null`. `index` holds one position per row, which is the
/// source row for normalized output and `0..n` everywhere else.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    index: Vec<usize>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
            index: Vec::new(),
        }
    }

    /// Build a table from complete rows with a contiguous index.
    ///
    /// Short rows are padded with nulls, long rows are truncated.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let mut table = Table::new(columns);
        for (position, row) in rows.into_iter().enumerate() {
            table.push_row(row, position);
        }
        table
    }

    pub(crate) fn push_row(&mut self, mut row: Vec<Value>, position: usize) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
        self.index.push(position);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate over every cell of a column, top to bottom
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let position = self.column_position(name)?;
        Some(self.rows.iter().map(move |row| &row[position]))
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let position = self.column_position(column)?;
        self.rows.get(row).map(|r| &r[position])
    }

    /// Restrict the table to `names`, in the requested order.
    pub fn select(&self, names: &[String]) -> Result<Table> {
        let positions = names
            .iter()
            .map(|name| {
                self.column_position(name).ok_or_else(|| StageError::MissingColumn {
                    column: name.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| positions.iter().map(|&p| row[p].clone()).collect())
            .collect();

        Ok(Table {
            columns: names.to_vec(),
            rows,
            index: self.index.clone(),
        })
    }

    /// Keep the rows for which `keep` returns true; the index follows the rows.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[Value]) -> bool,
    {
        let mut table = Table::new(self.columns.clone());
        for (row, &position) in self.rows.iter().zip(&self.index) {
            if keep(row) {
                table.push_row(row.clone(), position);
            }
        }
        table
    }

    /// Replace the index with `0..len`
    pub fn reset_index(mut self) -> Table {
        self.index = (0..self.rows.len()).collect();
        self
    }

    /// Stack tables vertically.
    ///
    /// Columns are the ordered union of every part's columns, first seen first.
    /// Cells a part does not have become nulls. The result gets a fresh index.
    pub fn concat(parts: Vec<Table>) -> Result<Table> {
        if parts.is_empty() {
            return Err(StageError::EmptyConcat);
        }

        let mut columns: Vec<String> = Vec::new();
        for part in &parts {
            for column in &part.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut combined = Table::new(columns);
        for part in parts {
            let positions: Vec<usize> = part
                .columns
                .iter()
                .filter_map(|c| combined.column_position(c))
                .collect();

            for row in part.rows {
                let mut out = vec![Value::Null; combined.columns.len()];
                for (cell, &p) in row.into_iter().zip(&positions) {
                    out[p] = cell;
                }
                let position = combined.len();
                combined.push_row(out, position);
            }
        }

        Ok(combined)
    }
}

/// How list cells are expanded during normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListExpansion {
    /// One output row per list element
    #[default]
    Rows,
    /// One output column per list position (`tags.0`, `tags.1`, ...)
    Columns,
}

/// Presentation limits for rendering a table.
///
/// These never change which rows or columns a table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    /// Render every row instead of truncating the middle
    pub show_all_rows: bool,

    /// Render every column instead of truncating the middle
    pub show_all_columns: bool,
}

/// Configuration for flattening one or many files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenOptions {
    /// Key of the records array when the document's top level is an object
    pub object_key: Option<String>,

    /// Columns to keep before normalization (all when `None`)
    pub columns: Option<Vec<String>>,

    /// Drop rows whose list-typed cells are empty arrays
    pub remove_empty_lists: bool,

    /// Separator between parent and child names of expanded mappings
    pub separator: String,

    /// Strategy for list cells
    pub list_expansion: ListExpansion,

    /// Presentation-only toggles
    pub display: DisplayOptions,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        FlattenOptions {
            object_key: None,
            columns: None,
            remove_empty_lists: false,
            separator: String::from("."),
            list_expansion: ListExpansion::Rows,
            display: DisplayOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_keeps_requested_order() {
        let table = Table::from_rows(
            cols(&["a", "b", "c"]),
            vec![vec![json!(1), json!(2), json!(3)]],
        );

        let selected = table.select(&cols(&["c", "a"])).unwrap();
        assert_eq!(selected.columns(), &cols(&["c", "a"])[..]);
        assert_eq!(selected.rows()[0], vec![json!(3), json!(1)]);
    }

    #[test]
    fn test_select_unknown_column() {
        let table = Table::from_rows(cols(&["a"]), vec![vec![json!(1)]]);
        let err = table.select(&cols(&["a", "missing"])).unwrap_err();
        assert!(matches!(err, StageError::MissingColumn { ref column } if column == "missing"));
    }

    #[test]
    fn test_concat_unions_columns_and_reindexes() {
        let first = Table::from_rows(cols(&["id", "name"]), vec![vec![json!(1), json!("a")]]);
        let second = Table::from_rows(
            cols(&["id", "score"]),
            vec![vec![json!(2), json!(9.5)], vec![json!(3), json!(7)]],
        );

        let combined = Table::concat(vec![first, second]).unwrap();
        assert_eq!(combined.columns(), &cols(&["id", "name", "score"])[..]);
        assert_eq!(combined.len(), 3);
        assert_eq!(combined.index(), &[0, 1, 2]);
        assert_eq!(combined.get(0, "score").unwrap(), &Value::Null);
        assert_eq!(combined.get(2, "score").unwrap(), &json!(7));
    }

    #[test]
    fn test_concat_empty_collection_fails() {
        assert!(matches!(Table::concat(vec![]), Err(StageError::EmptyConcat)));
    }

    #[test]
    fn test_filter_keeps_source_positions() {
        let table = Table::from_rows(
            cols(&["n"]),
            vec![vec![json!(0)], vec![json!(1)], vec![json!(2)]],
        );
        let odd = table.filter_rows(|row| row[0].as_i64().unwrap_or(0) % 2 == 1);
        assert_eq!(odd.index(), &[1]);
        assert_eq!(odd.reset_index().index(), &[0]);
    }

    #[test]
    fn test_options_from_partial_toml() {
        let options: FlattenOptions = toml::from_str(
            r#"
            object_key = "data"
            remove_empty_lists = true
            list_expansion = "columns"
            "#,
        )
        .unwrap();

        assert_eq!(options.object_key.as_deref(), Some("data"));
        assert!(options.remove_empty_lists);
        assert_eq!(options.separator, ".");
        assert_eq!(options.list_expansion, ListExpansion::Columns);
    }
}
