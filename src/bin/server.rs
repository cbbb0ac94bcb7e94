//! experiment-session-server binary
//!
//! Runs the experiment orchestrator core over a line-oriented transport:
//! every stdin line is a `Request` envelope (`{"subject": …, "body": {…}}`)
//! and every stdout line is the matching `Reply`.
//!
//! ## Configuration (env / TOML via `config` crate)
//!
//! | Key                                   | Default | Description                    |
//! |---------------------------------------|---------|--------------------------------|
//! | `EXPERIMENT__MAX_ACTIVE_EXPERIMENTS`  | `10`    | Registry capacity              |
//! | `EXPERIMENT__WORLD_RADIUS`            | `10`    | Hex radius of the world layout |
//! | `EXPERIMENT__SWEEP_INTERVAL_MS`       | `1000`  | Timeout sweep period           |
//! | `EXPERIMENT__TIMEOUTS__EPISODE_SECS`  | `30`    | Waiting-for-episode deadline   |
//! | `EXPERIMENT__PARAMETERS__VISUAL_RANGE`| `1.0`   | Visual range (canonical)       |

use anyhow::{Context, Result};
use clap::Parser;
use experiment_session::{ExperimentService, Router, ServiceConfig, TimeoutWatchdog};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "experiment-session-server",
    about = "Experiment session orchestrator",
    version
)]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "EXPERIMENT_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum concurrently active experiments
    #[arg(long, env = "EXPERIMENT_MAX_ACTIVE")]
    max_active: Option<usize>,

    /// Timeout sweep period in milliseconds
    #[arg(long, env = "EXPERIMENT_SWEEP_INTERVAL_MS")]
    sweep_interval_ms: Option<u64>,

    /// Predator speed in metres per second (converted to canonical units)
    #[arg(long)]
    predator_speed_metric: Option<f32>,

    /// Visual range in metres (converted to canonical units)
    #[arg(long)]
    visual_range_metric: Option<f32>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise logging (stderr, stdout carries replies)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("experiment_session=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = ServiceConfig::load(args.config.as_deref())
        .context("Failed to load service configuration")?;
    if let Some(max_active) = args.max_active {
        config.max_active_experiments = max_active;
    }
    if let Some(interval) = args.sweep_interval_ms {
        config.sweep_interval_ms = interval;
    }
    if let Some(speed) = args.predator_speed_metric {
        config.parameters.set_predator_speed_metric(speed);
    }
    if let Some(range) = args.visual_range_metric {
        config.parameters.set_visual_range_metric(range);
    }

    tracing::info!(
        max_active = config.max_active_experiments,
        world_radius = config.world_radius,
        sweep_interval_ms = config.sweep_interval_ms,
        "Starting experiment-session-server"
    );

    let sweep_interval = Duration::from_millis(config.sweep_interval_ms.max(1));
    let service = Arc::new(ExperimentService::new(config));
    let router = Router::new(service.clone());

    // Timeout watchdog
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watchdog = tokio::spawn(TimeoutWatchdog::new(service, sweep_interval).run(shutdown_rx));

    // Request loop
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read request")? else {
                    log::info!("stdin closed, shutting down");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let reply = router.handle_request(&line);
                stdout.write_all(&reply).await.context("Failed to write reply")?;
                stdout.write_all(b"\n").await.context("Failed to write reply")?;
                stdout.flush().await.context("Failed to flush reply")?;
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("experiment-session-server shutting down (SIGINT)");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    let sweeps = watchdog.await.context("Watchdog task failed")?;
    log::debug!("Watchdog ran {} sweeps", sweeps);
    Ok(())
}
