//! Append-only CSV log, one row per tick.

use std::fs::OpenOptions;
use std::path::Path;

use csv::{QuoteStyle, WriterBuilder};

use super::StorageError;
use crate::measure::MeasurementRecord;

/// Fixed header row; column order matches the record's field order and
/// is frozen for the life of a log file.
pub const HEADER: [&str; 10] = [
    "Timestamp",
    "ComputerName",
    "LatencyMs",
    "DownloadMbps",
    "UploadMbps",
    "PacketLoss",
    "ISP",
    "ServerName",
    "ServerLocation",
    "ResultUrl",
];

/// Append one record, creating the file (and parent directories) with
/// the header row if it does not exist yet. A single append per tick,
/// no read-modify-write of prior rows.
pub fn append(path: &Path, record: &MeasurementRecord) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::write_failed(path, e))?;
        }
    }

    let is_new = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StorageError::write_failed(path, e))?;

    // Always quote so free-text fields with embedded commas (server
    // locations) never break the column structure.
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .has_headers(false)
        .from_writer(file);

    if is_new {
        writer
            .write_record(HEADER)
            .map_err(|e| StorageError::write_failed(path, e))?;
    }

    writer
        .write_record(row(record))
        .map_err(|e| StorageError::write_failed(path, e))?;
    writer
        .flush()
        .map_err(|e| StorageError::write_failed(path, e))?;

    Ok(())
}

/// Nulls serialize as empty fields; rounded metrics keep one decimal.
fn row(r: &MeasurementRecord) -> [String; 10] {
    [
        r.timestamp.clone(),
        r.computer_name.clone(),
        fmt_rounded(r.latency_ms),
        fmt_rounded(r.download_mbps),
        fmt_rounded(r.upload_mbps),
        r.packet_loss.map(|v| v.to_string()).unwrap_or_default(),
        r.isp.clone().unwrap_or_default(),
        r.server_name.clone().unwrap_or_default(),
        r.server_location.clone().unwrap_or_default(),
        r.result_url.clone().unwrap_or_default(),
    ]
}

fn fmt_rounded(v: Option<f64>) -> String {
    v.map(|v| format!("{:.1}", v)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: &str) -> MeasurementRecord {
        MeasurementRecord {
            timestamp: ts.to_string(),
            computer_name: "testhost".to_string(),
            latency_ms: Some(23.5),
            download_mbps: Some(100.0),
            upload_mbps: Some(20.0),
            packet_loss: Some(0.5),
            isp: Some("Example Fiber".to_string()),
            server_name: Some("Example Server".to_string()),
            server_location: Some("Springfield, IL".to_string()),
            result_url: Some("https://example.test/r/1".to_string()),
        }
    }

    #[test]
    fn test_creates_file_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("speedlog.csv");

        append(&path, &sample("2026-08-29T12:00:00")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "\"Timestamp\",\"ComputerName\",\"LatencyMs\",\"DownloadMbps\",\"UploadMbps\",\"PacketLoss\",\"ISP\",\"ServerName\",\"ServerLocation\",\"ResultUrl\""
        );
        let row = lines.next().unwrap();
        assert!(row.contains("\"100.0\""));
        assert!(row.contains("\"Springfield, IL\""));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_appends_in_order_without_extra_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speedlog.csv");

        append(&path, &sample("2026-08-29T12:00:00")).unwrap();
        append(
            &path,
            &MeasurementRecord::failure("2026-08-29T12:05:00".into(), "testhost".into()),
        )
        .unwrap();
        append(&path, &sample("2026-08-29T12:10:00")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("\"2026-08-29T12:00:00\""));
        assert!(lines[2].starts_with("\"2026-08-29T12:05:00\""));
        assert!(lines[3].starts_with("\"2026-08-29T12:10:00\""));
    }

    #[test]
    fn test_failure_row_has_empty_metrics_and_error_isp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speedlog.csv");

        let rec = MeasurementRecord::failure("2026-08-29T12:00:00".into(), "testhost".into());
        append(&path, &rec).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let row = content.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "\"2026-08-29T12:00:00\",\"testhost\",\"\",\"\",\"\",\"\",\"ERROR\",\"\",\"\",\"\""
        );
    }
}
