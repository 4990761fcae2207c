//! Reading JSON files into raw record tables.

use crate::error::{Result, StageError};
use crate::types::Table;
use serde_json::{Map, Value};
use std::path::Path;

/// Column used for records that are not JSON objects
pub const SCALAR_COLUMN: &str = "value";

/// Load the records of one JSON file as a raw table.
///
/// When the document is an object, the records are the array stored under
/// `object_key`. When it is an array, the array itself holds the records and
/// `object_key` is not consulted.
pub fn load_records(path: &Path, object_key: Option<&str>) -> Result<Table> {
    let content = std::fs::read(path).map_err(|source| StageError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let document = parse_document(path, content)?;
    let records = extract_records(path, document, object_key)?;

    tracing::debug!(path = %path.display(), records = records.len(), "Loaded records");
    Ok(records_to_table(records))
}

/// Parse with simd-json first, re-parsing with serde_json only to report errors.
///
/// simd-json parses in place and leaves `content` scrambled on failure, so the
/// fallback reads the file again.
fn parse_document(path: &Path, mut content: Vec<u8>) -> Result<Value> {
    let simd_err = match simd_json::serde::from_slice::<Value>(&mut content) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    tracing::debug!(error = %simd_err, "simd-json rejected document");

    let original = std::fs::read(path).map_err(|source| StageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice::<Value>(&original).map_err(|err| StageError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn extract_records(path: &Path, document: Value, object_key: Option<&str>) -> Result<Vec<Value>> {
    let target = match document {
        Value::Object(mut obj) => {
            let Some(key) = object_key else {
                return Err(StageError::NotAnArray {
                    path: path.to_path_buf(),
                    found: "object",
                });
            };
            obj.remove(key).ok_or_else(|| StageError::MissingObjectKey {
                key: key.to_string(),
                path: path.to_path_buf(),
            })?
        }
        other => other,
    };

    match target {
        Value::Array(records) => Ok(records),
        other => Err(StageError::NotAnArray {
            path: path.to_path_buf(),
            found: type_name(&other),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Turn a list of records into a table, one row per record.
///
/// Columns appear in first-seen order across all records. Records lacking a
/// key get a null cell; non-object records land in the `value` column.
pub fn records_to_table(records: Vec<Value>) -> Table {
    let mut columns: Vec<String> = Vec::new();
    let objects: Vec<Map<String, Value>> = records
        .into_iter()
        .map(|record| match record {
            Value::Object(obj) => obj,
            scalar => {
                let mut obj = Map::new();
                obj.insert(SCALAR_COLUMN.to_string(), scalar);
                obj
            }
        })
        .collect();

    for obj in &objects {
        for key in obj.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = objects
        .into_iter()
        .map(|mut obj| {
            columns
                .iter()
                .map(|c| obj.remove(c).unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Table::from_rows(columns, rows)
}
