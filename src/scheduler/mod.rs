//! The run-window schedule loop.
//!
//! One logical task drives everything: a tick runs to completion
//! (invoke, parse, persist) before the next tick's timing is computed,
//! so no locking is needed anywhere. Each tick anchors to its own
//! planned start rather than to the end of the previous sleep, which
//! keeps cadence nominal even though measurements take variable time.

use std::time::Duration;

use chrono::Local;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::measure::{MeasureError, MeasurementRecord, MeasurementSource};
use crate::storage::{self, LogPaths};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// The scheduling envelope for one run.
#[derive(Debug, Clone)]
pub struct RunWindow {
    pub start: Instant,
    pub end: Instant,
    pub interval: Duration,
    /// floor(duration / interval); progress reporting only, never a
    /// termination condition.
    pub planned_ticks: u64,
}

impl RunWindow {
    /// Open a window starting now.
    pub fn open(duration: Duration, interval: Duration) -> Self {
        let start = Instant::now();
        let planned_ticks = if interval.is_zero() {
            0
        } else {
            (duration.as_secs_f64() / interval.as_secs_f64()).floor() as u64
        };
        Self {
            start,
            end: start + duration,
            interval,
            planned_ticks,
        }
    }
}

/// Outcome counters for one completed run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    /// Ticks executed (and records produced).
    pub ticks: u64,
    /// Ticks recorded as failure records.
    pub failures: u64,
    /// Individual log writes that failed.
    pub write_errors: u64,
}

/// Drive ticks until the window closes.
///
/// The body runs at least once even when the window is shorter than
/// the interval. Every tick produces a record -- a failed measurement
/// degrades to a failure record, and log-write errors are reported
/// without stopping the loop. Only wall-clock expiry ends the run.
pub async fn run_schedule_loop<S: MeasurementSource>(
    window: &RunWindow,
    source: &S,
    paths: &LogPaths,
    host: &str,
) -> RunSummary {
    let mut summary = RunSummary::default();

    loop {
        let tick_start = Instant::now();
        summary.ticks += 1;
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();

        info!(
            tick = summary.ticks,
            planned = window.planned_ticks,
            "Running speed test"
        );

        let record = match measure_once(source, &timestamp, host).await {
            Ok(record) => record,
            Err(e) => {
                warn!(tick = summary.ticks, "Measurement failed: {}", e);
                summary.failures += 1;
                MeasurementRecord::failure(timestamp, host.to_string())
            }
        };

        summary.write_errors += storage::persist_record(paths, &record) as u64;

        if Instant::now() >= window.end {
            break;
        }
        // Anchor to this tick's planned start; never sleep past the
        // window deadline.
        let next_planned = tick_start + window.interval;
        tokio::time::sleep_until(next_planned.min(window.end)).await;
        if Instant::now() >= window.end {
            break;
        }
    }

    summary
}

async fn measure_once<S: MeasurementSource>(
    source: &S,
    timestamp: &str,
    host: &str,
) -> Result<MeasurementRecord, MeasureError> {
    let raw = source.invoke().await?;
    crate::measure::parse::parse_record(&raw, timestamp.to_string(), host.to_string())
}
