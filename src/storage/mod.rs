//! Durable log storage -- CSV tabular log plus JSON array document log.

pub mod csv;
pub mod json;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::measure::MeasurementRecord;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write log {path}: {source}")]
    LogWriteFailed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("document log {path} is not a JSON array; refusing to overwrite prior history")]
    CorruptLog { path: PathBuf },
}

impl StorageError {
    fn write_failed(path: &Path, source: impl Into<anyhow::Error>) -> Self {
        Self::LogWriteFailed {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}

/// The pair of log files for one run. The document log sits next to
/// the CSV with the extension swapped.
#[derive(Debug, Clone)]
pub struct LogPaths {
    pub csv: PathBuf,
    pub json: PathBuf,
}

impl LogPaths {
    pub fn new(csv_path: &Path) -> Self {
        Self {
            csv: csv_path.to_path_buf(),
            json: csv_path.with_extension("json"),
        }
    }
}

/// Persist one record to both logs. The two writes are independent:
/// a failure in one is reported and does not block the other, and
/// neither aborts the run.
pub fn persist_record(paths: &LogPaths, record: &MeasurementRecord) -> usize {
    let mut failures = 0;

    if let Err(e) = csv::append(&paths.csv, record) {
        tracing::error!(path = %paths.csv.display(), "CSV log append failed: {}", e);
        failures += 1;
    }
    if let Err(e) = json::append(&paths.json, record) {
        tracing::error!(path = %paths.json.display(), "Document log append failed: {}", e);
        failures += 1;
    }

    failures
}
