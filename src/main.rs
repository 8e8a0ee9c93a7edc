use anyhow::Result;
use clap::{Parser, Subcommand};

use speedspool::config::{self, RunConfig};

#[derive(Parser)]
#[command(
    name = "speedspool",
    about = "Unattended periodic internet speed-test logger",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the logger over a bounded window
    Run {
        /// Total run window, e.g. "8h"
        #[arg(long, default_value = "8h")]
        duration: String,

        /// Spacing between test starts, e.g. "5m"
        #[arg(long, default_value = "5m")]
        interval: String,

        /// CSV log path; the JSON log lands next to it
        #[arg(long, default_value = "speedlog.csv")]
        log: String,

        /// Bound on a single speedtest invocation
        #[arg(long, default_value = "120s")]
        timeout: String,

        /// Try a package-manager install if the speedtest CLI is missing
        #[arg(long)]
        auto_install: bool,
    },

    /// Verify the speedtest CLI is installed and usable
    Check {
        /// Try a package-manager install if the CLI is missing
        #[arg(long)]
        auto_install: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            duration,
            interval,
            log,
            timeout,
            auto_install,
        } => {
            let mut cfg = RunConfig::new(
                config::parse_duration(&duration)?,
                config::parse_duration(&interval)?,
                &log,
            );
            cfg.timeout = config::parse_duration(&timeout)?;
            cfg.auto_install = auto_install;

            tracing::info!(%duration, %interval, log = %log, "Starting speedspool");
            let summary = speedspool::run(cfg).await?;
            println!(
                "Run complete: {} tests, {} failed, {} log-write errors.",
                summary.ticks, summary.failures, summary.write_errors
            );
        }
        Commands::Check { auto_install } => {
            speedspool::check(auto_install).await?;
            println!("speedtest CLI is available.");
        }
    }

    Ok(())
}
