use crate::error::{ProcessingError, Result};
use crate::models::RawRecord;
use crate::utils::constants::SNAPSHOT_EXTENSION;
use crate::utils::decode_utf8;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads historical JSON snapshot files.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotReader;

impl SnapshotReader {
    pub fn new() -> Self {
        Self
    }

    /// List `*.json` files in a directory, sorted by file name
    pub fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(ProcessingError::Config(format!(
                "Snapshot directory not found: {}",
                dir.display()
            )));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == SNAPSHOT_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();

        Ok(files)
    }

    /// Read the records of one snapshot file.
    ///
    /// Accepts either a top-level array of records or an object with a `records` array.
    /// Array elements that are not objects become empty records, which validation rejects.
    /// Any other top-level shape is an error.
    pub fn read_file(&self, path: &Path) -> Result<Vec<RawRecord>> {
        let bytes = fs::read(path)?;
        let value: Value = serde_json::from_str(&decode_utf8(&bytes))?;
        self.extract_records(value, &display_name(path))
    }

    fn extract_records(&self, value: Value, file: &str) -> Result<Vec<RawRecord>> {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("records") {
                Some(Value::Array(items)) => items,
                Some(_) => {
                    return Err(ProcessingError::InvalidShape {
                        file: file.to_string(),
                        message: "`records` is not an array".to_string(),
                    })
                }
                None => {
                    return Err(ProcessingError::InvalidShape {
                        file: file.to_string(),
                        message: "object has no `records` array".to_string(),
                    })
                }
            },
            other => {
                return Err(ProcessingError::InvalidShape {
                    file: file.to_string(),
                    message: format!("top-level value is {}", json_type(&other)),
                })
            }
        };

        let mut non_objects = 0;
        let records: Vec<RawRecord> = items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => map.into_iter().collect(),
                _ => {
                    non_objects += 1;
                    RawRecord::new()
                }
            })
            .collect();

        // Kept as empty records so validation counts them as rejects.
        if non_objects > 0 {
            tracing::warn!("{}: {} entries are not objects", file, non_objects);
        }

        Ok(records)
    }
}

impl Default for SnapshotReader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
