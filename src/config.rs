//! Run configuration -- immutable parameters for one logging run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};

/// Default bound on a single speedtest invocation. A hung subprocess
/// would otherwise stall the whole schedule.
pub const DEFAULT_SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(120);

/// Everything the schedule loop needs, fixed for the life of the run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Total wall-clock window to keep scheduling ticks.
    pub duration: Duration,
    /// Nominal spacing between tick starts.
    pub interval: Duration,
    /// Destination for the CSV log; the JSON document log path is
    /// derived from this by swapping the extension.
    pub csv_path: PathBuf,
    /// Bound on one subprocess invocation.
    pub timeout: Duration,
    /// Attempt a best-effort package-manager install when the
    /// speedtest binary is missing.
    pub auto_install: bool,
}

impl RunConfig {
    pub fn new(duration: Duration, interval: Duration, csv_path: impl AsRef<Path>) -> Self {
        Self {
            duration,
            interval,
            csv_path: csv_path.as_ref().to_path_buf(),
            timeout: DEFAULT_SUBPROCESS_TIMEOUT,
            auto_install: false,
        }
    }

    /// Reject parameter combinations that cannot schedule sanely. A
    /// zero interval would launch tests back-to-back for the whole
    /// window.
    pub fn validate(&self) -> Result<()> {
        if self.duration.is_zero() {
            bail!("run duration must be greater than zero");
        }
        if self.interval.is_zero() {
            bail!("interval must be greater than zero");
        }
        Ok(())
    }
}

/// Parse a human duration like "30s", "5m", "8h". A bare number is
/// taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        bail!("empty duration");
    }

    let (value, unit) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim()),
        None => (s, "s"),
    };

    let n: f64 = value
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid duration '{}'", s))?;
    if n < 0.0 || !n.is_finite() {
        bail!("invalid duration '{}'", s);
    }

    let secs = match unit {
        "s" | "sec" | "secs" => n,
        "m" | "min" | "mins" => n * 60.0,
        "h" | "hr" | "hrs" => n * 3600.0,
        _ => bail!("unknown duration unit '{}' in '{}'", unit, s),
    };

    Duration::try_from_secs_f64(secs).map_err(|_| anyhow::anyhow!("duration '{}' is too large", s))
}
