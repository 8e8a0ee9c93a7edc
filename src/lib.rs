//! speedspool -- unattended periodic internet speed-test logger.
//!
//! This crate wraps the Ookla `speedtest` CLI: on a fixed interval over a
//! bounded run window it invokes the tool, normalizes the JSON result, and
//! appends the record to a CSV log plus a JSON array document log.

pub mod config;
pub mod measure;
pub mod scheduler;
pub mod storage;

use anyhow::Result;

use crate::config::RunConfig;
use crate::measure::{hostname, OoklaSource};
use crate::scheduler::{run_schedule_loop, RunSummary, RunWindow};
use crate::storage::LogPaths;

/// Drive one full logging run: verify the speedtest CLI, open the run
/// window, and loop until the window closes.
///
/// The only fatal condition is an unusable speedtest binary at startup;
/// every per-tick failure is recorded and the loop carries on.
pub async fn run(config: RunConfig) -> Result<RunSummary> {
    config.validate()?;

    let source = OoklaSource::new(config.timeout);
    source.ensure_available(config.auto_install).await?;

    let host = hostname();
    let paths = LogPaths::new(&config.csv_path);
    let window = RunWindow::open(config.duration, config.interval);

    tracing::info!(
        host = %host,
        csv = %paths.csv.display(),
        json = %paths.json.display(),
        planned_ticks = window.planned_ticks,
        "Starting speed-test run"
    );

    let summary = run_schedule_loop(&window, &source, &paths, &host).await;

    tracing::info!(
        ticks = summary.ticks,
        failures = summary.failures,
        "Run window closed"
    );

    Ok(summary)
}

/// Verify the speedtest CLI is usable, optionally attempting installation.
pub async fn check(auto_install: bool) -> Result<()> {
    let source = OoklaSource::default();
    source.ensure_available(auto_install).await?;
    tracing::info!("speedtest CLI is available");
    Ok(())
}
