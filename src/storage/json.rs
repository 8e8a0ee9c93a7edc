//! JSON array document log.
//!
//! The whole file is read, the new record pushed onto the array, and
//! the file rewritten. O(n) per append, which is fine at the target
//! scale of a few hundred records per run; do not "optimize" this in a
//! way that reorders the array. The rewrite goes through a sibling
//! temp file and a rename so a crash mid-write cannot truncate history.

use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::StorageError;
use crate::measure::MeasurementRecord;

/// Append one record to the array, preserving all prior elements in
/// order. A missing or empty file starts as an empty array; any other
/// non-array content is corruption and is never overwritten.
pub fn append(path: &Path, record: &MeasurementRecord) -> Result<(), StorageError> {
    let mut array = read_array(path)?;

    let element = serde_json::to_value(record).map_err(|e| StorageError::write_failed(path, e))?;
    array.push(element);

    let body = serde_json::to_string_pretty(&Value::Array(array))
        .map_err(|e| StorageError::write_failed(path, e))?;

    let tmp = tmp_path(path);
    std::fs::write(&tmp, body).map_err(|e| StorageError::write_failed(path, e))?;
    std::fs::rename(&tmp, path).map_err(|e| StorageError::write_failed(path, e))?;

    Ok(())
}

fn read_array(path: &Path) -> Result<Vec<Value>, StorageError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::write_failed(path, e)),
    };

    if content.trim().is_empty() {
        if !content.is_empty() {
            tracing::debug!(
                path = %path.display(),
                len = content.len(),
                "Blank document log treated as fresh; starting a new array"
            );
        }
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(array)) => Ok(array),
        _ => Err(StorageError::CorruptLog {
            path: path.to_path_buf(),
        }),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
