//! tempod — the Tempo health monitor daemon.
//!
//! Probes one HTTP or TCP target on an adaptive schedule and logs every
//! status transition and probe error.
//!
//! # Usage
//!
//! ```text
//! tempod scaffold > tempo.toml
//! tempod run --config tempo.toml
//! tempod probe --config tempo.toml
//! ```

mod config;
mod probe;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use tempo_health::{DEFAULT_WINDOW, Monitor, Status};

use crate::config::DaemonConfig;

#[derive(Parser)]
#[command(name = "tempod", about = "Tempo health monitor daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Monitor the configured target until interrupted.
    Run {
        /// Path to tempo.toml.
        #[arg(long, short, default_value = "tempo.toml")]
        config: PathBuf,
    },
    /// Run a single probe and print the resulting metrics as JSON.
    Probe {
        /// Path to tempo.toml.
        #[arg(long, short, default_value = "tempo.toml")]
        config: PathBuf,
    },
    /// Print a starter tempo.toml.
    Scaffold,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    match cli.command {
        Command::Run { config } => run(DaemonConfig::from_file(&config)?).await,
        Command::Probe { config } => probe_once(DaemonConfig::from_file(&config)?).await,
        Command::Scaffold => {
            print!("{}", DaemonConfig::scaffold().to_toml_string()?);
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tempod=debug,tempo_health=debug"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    let monitor = Monitor::named(config.name.clone(), config.intervals.clone())?;

    for status in Status::ALL {
        let name = config.name.clone();
        monitor.on(status, move |event| {
            let metrics = &event.metrics;
            match event.status {
                Status::Healthy => info!(
                    monitor = %name,
                    availability = metrics.availability,
                    streak = metrics.current_streak,
                    "target healthy"
                ),
                Status::Suspect => warn!(
                    monitor = %name,
                    availability = metrics.availability,
                    "target suspect"
                ),
                Status::Unhealthy => error!(
                    monitor = %name,
                    availability = metrics.availability,
                    "target unhealthy"
                ),
            }
        });
    }

    let name = config.name.clone();
    monitor
        .on_error(move |err| warn!(monitor = %name, error = %err, "probe error"))
        .check(probe::build(&config.probe));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    monitor.stop();

    let metrics = monitor.metrics();
    info!(
        availability = metrics.availability,
        probes = monitor.recent_history(DEFAULT_WINDOW).len(),
        status = %monitor.status(),
        "final metrics"
    );
    Ok(())
}

async fn probe_once(config: DaemonConfig) -> anyhow::Result<()> {
    let monitor = Monitor::named(config.name.clone(), config.intervals.clone())?;
    monitor
        .on_error(|err| warn!(error = %err, "probe error"))
        .set_probe(probe::build(&config.probe));

    let status = monitor.run_once().await;
    let report = serde_json::json!({
        "name": config.name,
        "status": status,
        "metrics": monitor.metrics(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
