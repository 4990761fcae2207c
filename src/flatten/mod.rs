//! Flattening raw record tables
//!
//! The pipeline for one table is: classify nested columns on the raw rows,
//! optionally drop rows holding empty lists, select the requested columns,
//! normalize, then reset the index the normalizer left behind.

pub mod normalize;

pub use normalize::Normalizer;

use crate::classify::classify_columns;
use crate::error::Result;
use crate::loader::load_records;
use crate::types::{FlattenOptions, Table};
use serde_json::Value;
use std::path::Path;

/// Flattens raw tables according to a set of options
pub struct Flattener<'a> {
    options: &'a FlattenOptions,
}

impl<'a> Flattener<'a> {
    pub fn new(options: &'a FlattenOptions) -> Self {
        Flattener { options }
    }

    /// Flatten a raw record table
    pub fn flatten(&self, raw: &Table) -> Result<Table> {
        // Must run on the raw table: normalization renames nested columns
        let classified = classify_columns(raw);
        tracing::debug!(
            sequences = ?classified.sequences,
            mappings = ?classified.mappings,
            "Classified nested columns"
        );

        let filtered = if self.options.remove_empty_lists && !classified.sequences.is_empty() {
            let positions: Vec<usize> = classified
                .sequences
                .iter()
                .filter_map(|c| raw.column_position(c))
                .collect();
            let kept = raw.filter_rows(|row| positions.iter().all(|&p| !is_empty_list(&row[p])));
            tracing::debug!(dropped = raw.len() - kept.len(), "Removed rows with empty lists");
            kept
        } else {
            raw.clone()
        };

        let selected = match &self.options.columns {
            Some(columns) => filtered.select(columns)?,
            None => filtered,
        };

        let normalizer = Normalizer::new(&self.options.separator, self.options.list_expansion);
        Ok(normalizer.normalize(&selected)?.reset_index())
    }
}

fn is_empty_list(value: &Value) -> bool {
    matches!(value, Value::Array(items) if items.is_empty())
}

/// Load one file and flatten its records
pub fn flatten_file(path: &Path, options: &FlattenOptions) -> Result<Table> {
    let raw = load_records(path, options.object_key.as_deref())?;
    Flattener::new(options).flatten(&raw)
}
