//! # json-stage - JSON to staging table loader
//!
//! Reads JSON files, flattens nested lists and mappings into tabular rows and
//! bulk-loads the result into a SQL Server staging table.
//!
//! ## Modules
//!
//! - **loader**: read one file's records into a raw table
//! - **classify**: find list-typed and mapping-typed columns
//! - **flatten**: filter empty lists, select columns, normalize
//! - **batch**: flatten many files (by ETL id, single file, directory)
//! - **export**: scoped bulk insert into `<schema>.<table>`
//!
//! ## Quick Start
//!
//! ```rust
//! use json_stage::{Flattener, FlattenOptions};
//! use json_stage::loader::records_to_table;
//! use serde_json::json;
//!
//! # fn main() -> json_stage::Result<()> {
//! let raw = records_to_table(vec![
//!     json!({"id": 1, "tags": []}),
//!     json!({"id": 2, "tags": ["a", "b"], "owner": {"name": "Alice"}}),
//! ]);
//!
//! let options = FlattenOptions {
//!     remove_empty_lists: true,
//!     ..FlattenOptions::default()
//! };
//! let flat = Flattener::new(&options).flatten(&raw)?;
//!
//! // one row per tag, owner promoted to "owner.name"
//! assert_eq!(flat.len(), 2);
//! assert!(flat.column_position("owner.name").is_some());
//! # Ok(())
//! # }
//! ```

use std::path::Path;

pub mod batch;
pub mod classify;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod flatten;
pub mod loader;
pub mod types;
pub mod writer;

// Re-export commonly used types for convenience
pub use batch::{flatten_directory, flatten_single, rerun_etl, FileInventory};
pub use classify::{classify_columns, nested_columns, ColumnClassification, Shape};
pub use config::StageConfig;
pub use error::{Result, StageError};
pub use export::{Connector, ExportReport, Exporter, StageTarget, StagingConnection};
pub use flatten::{flatten_file, Flattener};
pub use types::{DisplayOptions, FlattenOptions, ListExpansion, Table};
pub use writer::RowWriter;

/// Flatten one file and append it to a staging table
pub fn stage_file<C: Connector>(
    path: &Path,
    options: &FlattenOptions,
    exporter: &Exporter<C>,
    table_name: &str,
) -> Result<ExportReport> {
    let table = flatten_single(path, options)?;
    exporter.export(&table, table_name, &batch::display_name(path))
}
