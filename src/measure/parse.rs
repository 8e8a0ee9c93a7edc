//! Normalize raw speedtest JSON output into a [`MeasurementRecord`].

use serde_json::Value;

use super::{MeasureError, MeasurementRecord};

/// Convert one raw output blob for a single invocation into a record.
///
/// Empty or whitespace-only input means the invocation itself failed;
/// invalid JSON is a parse failure. Missing fields inside valid JSON
/// are never an error -- the corresponding columns stay null.
pub fn parse_record(
    raw: &str,
    timestamp: String,
    computer_name: String,
) -> Result<MeasurementRecord, MeasureError> {
    if raw.trim().is_empty() {
        return Err(MeasureError::MeasurementFailed {
            reason: "empty measurement output".to_string(),
        });
    }

    let json: Value = serde_json::from_str(raw)?;

    // Bandwidth comes in bytes/sec; Mbps is decimal megabit. A genuine
    // zero reading stays Some(0.0) rather than collapsing into "absent".
    let download_mbps = json
        .pointer("/download/bandwidth")
        .and_then(Value::as_f64)
        .map(|b| round1(b * 8.0 / 1_000_000.0));
    let upload_mbps = json
        .pointer("/upload/bandwidth")
        .and_then(Value::as_f64)
        .map(|b| round1(b * 8.0 / 1_000_000.0));
    let latency_ms = json
        .pointer("/ping/latency")
        .and_then(Value::as_f64)
        .map(round1);
    let packet_loss = json.get("packetLoss").and_then(Value::as_f64);

    Ok(MeasurementRecord {
        timestamp,
        computer_name,
        latency_ms,
        download_mbps,
        upload_mbps,
        packet_loss,
        isp: string_at(&json, "/isp"),
        server_name: string_at(&json, "/server/name"),
        server_location: string_at(&json, "/server/location"),
        result_url: string_at(&json, "/result/url"),
    })
}

fn string_at(json: &Value, pointer: &str) -> Option<String> {
    json.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Round to one decimal place, half away from zero, matching the
/// speedtest CLI's own display convention.
fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> MeasurementRecord {
        parse_record(raw, "2026-08-29T12:00:00".into(), "testhost".into()).unwrap()
    }

    const FULL_OUTPUT: &str = r#"{
        "type": "result",
        "ping": {"jitter": 0.382, "latency": 23.456},
        "download": {"bandwidth": 12500000, "bytes": 150000000},
        "upload": {"bandwidth": 2500000, "bytes": 30000000},
        "packetLoss": 0.5,
        "isp": "Example Fiber",
        "server": {"name": "Example Server", "location": "Springfield, IL"},
        "result": {"url": "https://www.speedtest.net/result/c/abc123"}
    }"#;

    #[test]
    fn test_bandwidth_conversion_exact() {
        let rec = parse(FULL_OUTPUT);
        // 12500000 bytes/s * 8 / 1e6 = 100.0 Mbps
        assert_eq!(rec.download_mbps, Some(100.0));
        assert_eq!(rec.upload_mbps, Some(20.0));
    }

    #[test]
    fn test_latency_rounds_to_one_decimal() {
        let rec = parse(FULL_OUTPUT);
        assert_eq!(rec.latency_ms, Some(23.5));
    }

    #[test]
    fn test_descriptive_fields() {
        let rec = parse(FULL_OUTPUT);
        assert_eq!(rec.isp.as_deref(), Some("Example Fiber"));
        assert_eq!(rec.server_name.as_deref(), Some("Example Server"));
        assert_eq!(rec.server_location.as_deref(), Some("Springfield, IL"));
        assert_eq!(
            rec.result_url.as_deref(),
            Some("https://www.speedtest.net/result/c/abc123")
        );
        assert_eq!(rec.packet_loss, Some(0.5));
        assert!(!rec.is_failure());
    }

    #[test]
    fn test_missing_fields_become_null_not_error() {
        let rec = parse(r#"{"ping": {"latency": 9.04}}"#);
        assert_eq!(rec.latency_ms, Some(9.0));
        assert_eq!(rec.download_mbps, None);
        assert_eq!(rec.upload_mbps, None);
        assert_eq!(rec.packet_loss, None);
        assert_eq!(rec.isp, None);
        assert_eq!(rec.result_url, None);
    }

    #[test]
    fn test_zero_bandwidth_is_kept_not_nulled() {
        let rec = parse(r#"{"download": {"bandwidth": 0}, "upload": {"bandwidth": 0}}"#);
        assert_eq!(rec.download_mbps, Some(0.0));
        assert_eq!(rec.upload_mbps, Some(0.0));
    }

    #[test]
    fn test_empty_output_is_invocation_failure() {
        let err = parse_record("   \n", "t".into(), "h".into()).unwrap_err();
        assert!(matches!(err, MeasureError::MeasurementFailed { .. }));
    }

    #[test]
    fn test_invalid_json_is_parse_failure() {
        let err = parse_record("not json at all", "t".into(), "h".into()).unwrap_err();
        assert!(matches!(err, MeasureError::ParseFailed(_)));
    }

    #[test]
    fn test_failure_record_shape() {
        let rec = MeasurementRecord::failure("2026-08-29T12:00:00".into(), "testhost".into());
        assert_eq!(rec.timestamp, "2026-08-29T12:00:00");
        assert_eq!(rec.computer_name, "testhost");
        assert_eq!(rec.isp.as_deref(), Some("ERROR"));
        assert_eq!(rec.latency_ms, None);
        assert_eq!(rec.download_mbps, None);
        assert_eq!(rec.upload_mbps, None);
        assert_eq!(rec.packet_loss, None);
        assert_eq!(rec.server_name, None);
        assert_eq!(rec.server_location, None);
        assert_eq!(rec.result_url, None);
        assert!(rec.is_failure());
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round1(23.45), 23.5);
        assert_eq!(round1(-23.45), -23.5);
        assert_eq!(round1(23.44), 23.4);
    }
}
