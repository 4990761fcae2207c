//! Column shape classification
//!
//! Finds the columns of a raw table whose every cell is a list or whose every
//! cell is a mapping. The flattener classifies before it filters or
//! normalizes, because normalization renames and introduces columns.

use crate::types::Table;
use serde_json::Value;

/// Structural shape a cell can be tested against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// JSON array
    Sequence,
    /// JSON object
    Mapping,
}

impl Shape {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Shape::Sequence => matches!(value, Value::Array(_)),
            Shape::Mapping => matches!(value, Value::Object(_)),
        }
    }
}

/// Sequence-typed and mapping-typed column names of one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnClassification {
    pub sequences: Vec<String>,
    pub mappings: Vec<String>,
}

/// Names of the columns whose every cell matches `shape`, in column order.
///
/// A column mixing shapes, or holding any null or missing cell, is excluded.
/// A column with no cells at all is not classified.
pub fn nested_columns(table: &Table, shape: Shape) -> Vec<String> {
    if table.is_empty() {
        return Vec::new();
    }

    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(position, _)| table.rows().iter().all(|row| shape.matches(&row[*position])))
        .map(|(_, name)| name.clone())
        .collect()
}

/// Classify every column of `table` against both shapes
pub fn classify_columns(table: &Table) -> ColumnClassification {
    ColumnClassification {
        sequences: nested_columns(table, Shape::Sequence),
        mappings: nested_columns(table, Shape::Mapping),
    }
}
