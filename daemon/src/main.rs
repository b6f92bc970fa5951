//! Outrigger daemon binary
//!
//! Supervises a single external helper process according to a TOML
//! configuration, keeping it alive per its startup policy until the daemon
//! receives Ctrl+C.

#![allow(unused_crate_dependencies)]

use clap::Parser;
use daemon::{bootstrap, DaemonError};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "outriggerd", about = "Supervisor daemon for an external helper process", version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> daemon::Result<()> {
    let args = Args::parse();

    outrigger_core::utils::init_tracing(&args.log_level)
        .map_err(|e| DaemonError::ServerError(e.to_string()))?;

    info!("Starting outrigger daemon");

    let boot = bootstrap(args.config).await?;

    // The heartbeat keeps the supervisor's own poll loop task alive; the
    // loop does the actual liveness polling at its configured interval
    let mut heartbeat = tokio::time::interval(Duration::from_millis(200));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    return Err(DaemonError::ServerError(format!(
                        "Failed to listen for Ctrl+C: {}",
                        e
                    )));
                }
                info!("Received Ctrl+C, shutting down...");
                break;
            }
            _ = heartbeat.tick() => {
                boot.supervisor.tick();
            }
        }
    }

    boot.shutdown().await;
    info!("Daemon stopped");
    Ok(())
}
