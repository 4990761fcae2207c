//! Error types for loading, flattening and staging JSON data.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by every stage of the pipeline.
///
/// Nothing is recovered locally: each variant propagates to the direct caller.
#[derive(Debug, Error)]
pub enum StageError {
    // === Input Errors ===
    /// Failed to read a file or directory.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File content is not valid JSON.
    #[error("failed to parse JSON in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The document is an object but the requested key is absent.
    #[error("key '{key}' not found in {path}")]
    MissingObjectKey { key: String, path: PathBuf },

    /// The extracted value is not an array of records.
    #[error("expected an array of records in {path}, found {found}")]
    NotAnArray { path: PathBuf, found: &'static str },

    /// A requested column does not exist in the table.
    #[error("column '{column}' not found in table")]
    MissingColumn { column: String },

    /// Flattening produced the same column name twice in one row, e.g. a
    /// literal `a.b` key next to an `a` mapping holding `b`.
    #[error("flattened column '{column}' is produced by more than one field")]
    DuplicateColumn { column: String },

    // === Aggregation Errors ===
    /// A batch selected no files at all.
    #[error("no files matching {selector} in {location}")]
    NoMatchingFiles { selector: String, location: PathBuf },

    /// Concatenation was asked to combine zero tables.
    #[error("cannot concatenate an empty collection of tables")]
    EmptyConcat,

    // === Export Errors ===
    /// Destination schema or table name is not a plain SQL identifier.
    #[error("invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),

    /// Opening the database connection failed.
    #[error("failed to connect to database: {0}")]
    Connection(String),

    /// The bulk insert into the staging table failed.
    #[error("failed to insert into {target}: {message}")]
    Insert { target: String, message: String },

    /// Commit or rollback failed.
    #[error("transaction {action} failed: {message}")]
    Transaction {
        action: &'static str,
        message: String,
    },

    // === Configuration Errors ===
    /// Configuration file could not be parsed.
    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, StageError>;
