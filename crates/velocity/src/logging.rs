//! Logging initialization for the velocity binary.
//!
//! Two layers: stderr for the operator, an append-only file under
//! `DATA_DIR/logs/` for later inspection. `RUST_LOG` overrides the default
//! filter for both.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use velocity_protocol::paths::DataLayout;

const DEFAULT_FILTER: &str = "velocity=info,velocity_collector=info,velocity_discovery=info,\
                              velocity_fingerprint=info,velocity_loader=info,velocity_archive=info";

pub fn init(verbose: bool, json_mode: bool) -> Result<()> {
    let layout = DataLayout::resolve();
    std::fs::create_dir_all(layout.logs_dir()).context("failed to create log directory")?;
    let log_path = layout.logs_dir().join("velocity.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    } else if json_mode {
        EnvFilter::new("warn")
    } else {
        EnvFilter::new("velocity=info")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing init: {}", e))?;
    Ok(())
}
