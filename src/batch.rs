//! Batch drivers: flatten several files and stack the results.
//!
//! The file inventory and the flatten options are explicit arguments; every
//! file in a batch shares the same options.

use crate::error::{Result, StageError};
use crate::flatten::flatten_file;
use crate::types::{FlattenOptions, Table};
use std::path::{Path, PathBuf};

const JSON_SUFFIX: &str = ".json";

/// The regular files of one directory, sorted by file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInventory {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl FileInventory {
    /// List every regular file directly inside `dir`
    pub fn scan(dir: &Path) -> Result<Self> {
        let io_err = |source| StageError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        tracing::debug!(dir = %dir.display(), files = files.len(), "Scanned directory");
        Ok(FileInventory {
            root: dir.to_path_buf(),
            files,
        })
    }

    /// Build an inventory from an explicit list of files
    pub fn from_files(root: impl Into<PathBuf>, files: Vec<PathBuf>) -> Self {
        FileInventory {
            root: root.into(),
            files,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Files whose name, minus a trailing `.json`, ends with `etl_id`
    pub fn matching_etl_id<'a>(&'a self, etl_id: &'a str) -> impl Iterator<Item = &'a PathBuf> + 'a {
        self.files.iter().filter(move |path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.strip_suffix(JSON_SUFFIX).unwrap_or(name).ends_with(etl_id))
                .unwrap_or(false)
        })
    }
}

/// Re-run a pipeline: flatten every inventory file tagged with `etl_id`
pub fn rerun_etl(inventory: &FileInventory, etl_id: &str, options: &FlattenOptions) -> Result<Table> {
    let files: Vec<&PathBuf> = inventory.matching_etl_id(etl_id).collect();
    if files.is_empty() {
        return Err(StageError::NoMatchingFiles {
            selector: format!("ETL id '{}'", etl_id),
            location: inventory.root().to_path_buf(),
        });
    }

    tracing::info!(etl_id, files = files.len(), "Re-running pipeline");
    flatten_all(files, options)
}

/// Flatten exactly one file
pub fn flatten_single(path: &Path, options: &FlattenOptions) -> Result<Table> {
    let name = display_name(path);
    tracing::info!("Flattening {}...", name);

    let table = flatten_file(path, options)?;

    tracing::info!(rows = table.len(), "{} successfully flattened!", name);
    Ok(table)
}

/// Flatten every file of a directory into one table
pub fn flatten_directory(dir: &Path, options: &FlattenOptions) -> Result<Table> {
    let inventory = FileInventory::scan(dir)?;
    if inventory.files().is_empty() {
        return Err(StageError::NoMatchingFiles {
            selector: String::from("any file"),
            location: dir.to_path_buf(),
        });
    }

    flatten_all(inventory.files().iter(), options)
}

fn flatten_all<'a, I>(files: I, options: &FlattenOptions) -> Result<Table>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    let parts = files
        .into_iter()
        .map(|path| {
            tracing::debug!(path = %path.display(), "Flattening file");
            flatten_file(path, options)
        })
        .collect::<Result<Vec<_>>>()?;

    let combined = Table::concat(parts)?;
    tracing::info!(rows = combined.len(), columns = combined.num_columns(), "Combined tables");
    Ok(combined)
}

/// File name for progress messages
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
