//! Expansion of nested cells into flat scalar columns
//!
//! Mapping cells are promoted into `parent.child` columns, recursively. List
//! cells either repeat the row once per element or spread into positional
//! columns, depending on [`ListExpansion`]. Several list cells in one row
//! combine as a cartesian product.

use crate::error::{Result, StageError};
use crate::types::{ListExpansion, Table};
use serde_json::Value;
use std::collections::HashSet;

/// One partially built output row: column name and cell, in discovery order
type Partial = Vec<(String, Value)>;

/// Expands nested table cells into scalar columns
pub struct Normalizer<'a> {
    separator: &'a str,
    list_expansion: ListExpansion,
}

impl<'a> Normalizer<'a> {
    pub fn new(separator: &'a str, list_expansion: ListExpansion) -> Self {
        Normalizer {
            separator,
            list_expansion,
        }
    }

    /// Normalize every row of `table`.
    ///
    /// Each output row's index entry is the position of the input row it came
    /// from, so exploded rows share an index value. Fails with
    /// [`StageError::DuplicateColumn`] when two fields of one row flatten to
    /// the same name.
    pub fn normalize(&self, table: &Table) -> Result<Table> {
        let mut columns: Vec<String> = Vec::new();
        let mut expanded: Vec<(usize, Partial)> = Vec::new();

        for (row, &position) in table.rows().iter().zip(table.index()) {
            let mut partials: Vec<Partial> = vec![Vec::new()];
            for (name, cell) in table.columns().iter().zip(row) {
                let options = self.expand_value(name, cell);
                partials = cartesian(partials, options);
            }

            for partial in partials {
                ensure_unique(&partial)?;
                for (name, _) in &partial {
                    if !columns.contains(name) {
                        columns.push(name.clone());
                    }
                }
                expanded.push((position, partial));
            }
        }

        let mut normalized = Table::new(columns);
        for (position, partial) in expanded {
            let mut cells = vec![Value::Null; normalized.num_columns()];
            for (name, value) in partial {
                if let Some(p) = normalized.column_position(&name) {
                    cells[p] = value;
                }
            }
            normalized.push_row(cells, position);
        }

        Ok(normalized)
    }

    /// All flat alternatives for one cell
    fn expand_value(&self, prefix: &str, value: &Value) -> Vec<Partial> {
        match value {
            Value::Object(obj) if !obj.is_empty() => {
                let mut partials: Vec<Partial> = vec![Vec::new()];
                for (key, nested) in obj.iter() {
                    let name = self.child_name(prefix, key);
                    partials = cartesian(partials, self.expand_value(&name, nested));
                }
                partials
            }
            Value::Array(items) if !items.is_empty() => match self.list_expansion {
                ListExpansion::Rows => items
                    .iter()
                    .flat_map(|item| self.expand_value(prefix, item))
                    .collect(),
                ListExpansion::Columns => {
                    let mut partials: Vec<Partial> = vec![Vec::new()];
                    for (idx, item) in items.iter().enumerate() {
                        let name = self.child_name(prefix, &idx.to_string());
                        partials = cartesian(partials, self.expand_value(&name, item));
                    }
                    partials
                }
            },
            // Empty containers keep their column with a null cell
            Value::Object(_) | Value::Array(_) => vec![vec![(prefix.to_string(), Value::Null)]],
            scalar => vec![vec![(prefix.to_string(), scalar.clone())]],
        }
    }

    fn child_name(&self, prefix: &str, key: &str) -> String {
        format!("{}{}{}", prefix, self.separator, key)
    }
}

fn ensure_unique(partial: &Partial) -> Result<()> {
    let mut seen = HashSet::with_capacity(partial.len());
    for (name, _) in partial {
        if !seen.insert(name.as_str()) {
            return Err(StageError::DuplicateColumn {
                column: name.clone(),
            });
        }
    }
    Ok(())
}

fn cartesian(left: Vec<Partial>, right: Vec<Partial>) -> Vec<Partial> {
    if right.len() == 1 {
        let tail = &right[0];
        return left
            .into_iter()
            .map(|mut partial| {
                partial.extend(tail.iter().cloned());
                partial
            })
            .collect();
    }

    let mut out = Vec::with_capacity(left.len() * right.len());
    for partial in &left {
        for tail in &right {
            let mut combined = partial.clone();
            combined.extend(tail.iter().cloned());
            out.push(combined);
        }
    }
    out
}
