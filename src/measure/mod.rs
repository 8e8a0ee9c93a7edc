//! Speed-test invocation: the Ookla CLI subprocess and the normalized
//! record it produces.

pub mod parse;

use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DEFAULT_SUBPROCESS_TIMEOUT;

/// ISP field value marking a failed tick.
pub const FAILURE_ISP: &str = "ERROR";

const INSTALL_HINT: &str = "Install the official CLI: https://www.speedtest.net/apps/cli";

#[derive(Debug, Error)]
pub enum MeasureError {
    #[error("speedtest binary not found ({hint})")]
    ToolNotFound { hint: &'static str },

    #[error("speed test produced no usable output: {reason}")]
    MeasurementFailed { reason: String },

    #[error("speed test output was not valid JSON: {0}")]
    ParseFailed(#[from] serde_json::Error),
}

/// One test outcome, successful or failed. Field order here is the
/// column order of the CSV log and must not change for the life of a
/// log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    pub timestamp: String,
    pub computer_name: String,
    pub latency_ms: Option<f64>,
    pub download_mbps: Option<f64>,
    pub upload_mbps: Option<f64>,
    pub packet_loss: Option<f64>,
    pub isp: Option<String>,
    pub server_name: Option<String>,
    pub server_location: Option<String>,
    pub result_url: Option<String>,
}

impl MeasurementRecord {
    /// Record for a tick whose measurement never produced a result.
    /// Timestamp and host are still captured; everything else is null
    /// and the ISP column carries the failure marker.
    pub fn failure(timestamp: String, computer_name: String) -> Self {
        Self {
            timestamp,
            computer_name,
            latency_ms: None,
            download_mbps: None,
            upload_mbps: None,
            packet_loss: None,
            isp: Some(FAILURE_ISP.to_string()),
            server_name: None,
            server_location: None,
            result_url: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.isp.as_deref() == Some(FAILURE_ISP)
    }
}

/// Capability seam for the external measurement tool. Tests substitute
/// a canned source; production uses [`OoklaSource`].
#[async_trait::async_trait]
pub trait MeasurementSource: Send + Sync {
    /// Run one measurement and return the raw JSON text it emitted.
    async fn invoke(&self) -> Result<String, MeasureError>;
}

/// Runs the official Ookla `speedtest` CLI as a subprocess.
pub struct OoklaSource {
    timeout: Duration,
}

impl Default for OoklaSource {
    fn default() -> Self {
        Self::new(DEFAULT_SUBPROCESS_TIMEOUT)
    }
}

impl OoklaSource {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Check if `speedtest` is in PATH.
    pub fn is_available(&self) -> bool {
        std::process::Command::new("speedtest")
            .arg("--version")
            .output()
            .is_ok()
    }

    /// Fail fast when the binary is unusable; optionally try a
    /// package-manager install first. This is the only startup-time
    /// fatal path -- once the loop is running, a vanished binary is
    /// just another failed tick.
    pub async fn ensure_available(&self, auto_install: bool) -> Result<(), MeasureError> {
        if self.is_available() {
            return Ok(());
        }
        if auto_install {
            tracing::warn!("speedtest CLI missing, attempting package-manager install");
            self.try_install().await;
            if self.is_available() {
                tracing::info!("speedtest CLI installed");
                return Ok(());
            }
        }
        Err(MeasureError::ToolNotFound { hint: INSTALL_HINT })
    }

    /// Best effort only: walk the known package managers and re-probe.
    /// Every failure is swallowed; the caller re-checks availability.
    async fn try_install(&self) {
        let candidates: &[(&str, &[&str])] = &[
            ("apt-get", &["install", "-y", "speedtest"]),
            ("brew", &["install", "speedtest-cli"]),
            ("winget", &["install", "--accept-package-agreements", "Ookla.Speedtest.CLI"]),
        ];

        for (manager, args) in candidates {
            match tokio::process::Command::new(manager).args(*args).output().await {
                Ok(out) if out.status.success() => {
                    tracing::info!(%manager, "Package install succeeded");
                    return;
                }
                Ok(out) => {
                    tracing::debug!(%manager, code = ?out.status.code(), "Package install failed");
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::debug!(%manager, "Package manager unusable: {}", e);
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl MeasurementSource for OoklaSource {
    async fn invoke(&self) -> Result<String, MeasureError> {
        // speedtest --format=json --accept-license --accept-gdpr
        let child = tokio::process::Command::new("speedtest")
            .arg("--format=json")
            .arg("--accept-license")
            .arg("--accept-gdpr")
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(out)) => out,
            Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MeasureError::ToolNotFound { hint: INSTALL_HINT });
            }
            Ok(Err(e)) => {
                return Err(MeasureError::MeasurementFailed {
                    reason: format!("failed to launch speedtest: {}", e),
                });
            }
            Err(_) => {
                return Err(MeasureError::MeasurementFailed {
                    reason: format!("speedtest timed out after {:?}", self.timeout),
                });
            }
        };

        if !output.status.success() {
            return Err(MeasureError::MeasurementFailed {
                reason: format!(
                    "speedtest exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.trim().is_empty() {
            return Err(MeasureError::MeasurementFailed {
                reason: "speedtest produced empty output".to_string(),
            });
        }

        Ok(stdout)
    }
}

/// Machine name recorded with every measurement.
pub fn hostname() -> String {
    sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string())
}
