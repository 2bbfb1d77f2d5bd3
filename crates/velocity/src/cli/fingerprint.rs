//! `velocity fingerprint` - synchronous fingerprint pass over the sessions
//! inventory, persisting identified devices into assets.db.

use anyhow::Context;
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use velocity_db::DeviceUpsert;
use velocity_fingerprint::{FingerprintEngine, FingerprintOptions};
use velocity_net::Ssh2Connector;
use velocity_protocol::inventory::SessionsFile;
use velocity_protocol::{EventSink, JsonLineSink, NullSink, Vendor};

use crate::cli::context::{resolve_credentials, CliContext};
use crate::cli::output;

#[derive(Args, Debug)]
pub struct FingerprintArgs {
    /// Inventory file (default: DATA_DIR/discovery/sessions.yaml)
    #[arg(long)]
    pub inventory: Option<PathBuf>,

    #[arg(long, short = 'u')]
    pub username: String,

    /// Password (falls back to CRED_1_PASS)
    #[arg(long, short = 'p')]
    pub password: Option<String>,

    /// Concurrent SSH sessions
    #[arg(long)]
    pub workers: Option<usize>,

    /// Re-probe devices that are already fingerprinted
    #[arg(long)]
    pub refresh: bool,

    /// Stream progress events and the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Exit codes: 0 all identified, 1 partial, 2 total failure.
pub fn run(args: FingerprintArgs) -> anyhow::Result<u8> {
    let ctx = CliContext::open(true)?;
    let credentials = resolve_credentials(&args.username, args.password.as_deref())?;

    let inventory_path = args
        .inventory
        .clone()
        .unwrap_or_else(|| ctx.layout.sessions_file());
    let mut inventory = SessionsFile::load(&inventory_path)
        .with_context(|| format!("loading inventory {}", inventory_path.display()))?;

    let options = FingerprintOptions {
        max_workers: args
            .workers
            .unwrap_or(ctx.config.collection.fingerprint_workers),
        connect_timeout: Duration::from_secs(ctx.config.ssh.connect_timeout_secs),
        command_timeout: Duration::from_secs(ctx.config.ssh.command_timeout_secs),
        min_score: ctx
            .config
            .scoring
            .threshold_for(velocity_protocol::CaptureType::Version),
        refresh: args.refresh,
    };

    let sink: Arc<dyn EventSink> = if args.json {
        Arc::new(JsonLineSink::new(std::io::stdout()))
    } else {
        Arc::new(NullSink)
    };

    let engine = FingerprintEngine::new(Arc::new(Ssh2Connector::new()));
    let (outcomes, summary) =
        engine.fingerprint_inventory(&mut inventory, &credentials, &options, sink);

    inventory
        .save(&inventory_path)
        .with_context(|| format!("saving inventory {}", inventory_path.display()))?;

    // Persist identified devices.
    let assets = ctx.open_assets()?;
    ctx.runtime.block_on(async {
        for outcome in outcomes.iter().filter(|o| o.success) {
            let record = DeviceUpsert {
                name: outcome
                    .fields
                    .hostname
                    .clone()
                    .unwrap_or_else(|| outcome.name.clone()),
                management_ip: Some(outcome.ip.clone()),
                vendor: (outcome.vendor != Vendor::Unknown)
                    .then(|| outcome.vendor.display_name().to_string()),
                device_type: (outcome.vendor != Vendor::Unknown)
                    .then(|| outcome.vendor.as_str().to_string()),
                platform: (outcome.vendor != Vendor::Unknown)
                    .then(|| outcome.vendor.as_str().to_string()),
                model: outcome.fields.model.clone(),
                software_version: outcome.fields.software_version.clone(),
                serial: outcome.fields.serial.clone(),
                source_system: Some("fingerprint".to_string()),
                fingerprinted_at: Some(Utc::now()),
                ..Default::default()
            };
            assets.upsert_device(&record).await?;
        }
        anyhow::Ok(())
    })?;

    if args.json {
        let payload = serde_json::json!({
            "success": summary.identified > 0 || summary.failed == 0,
            "identified": summary.identified,
            "failed": summary.failed,
            "failed_devices": summary
                .failed_devices
                .iter()
                .map(|(name, reason)| serde_json::json!({"name": name, "reason": reason}))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "fingerprinted {} devices, {} failed",
            summary.identified, summary.failed
        );
        if !summary.failed_devices.is_empty() {
            let mut table = output::table(&["device", "reason"]);
            for (name, reason) in &summary.failed_devices {
                table.add_row(vec![name, reason]);
            }
            println!("{}", table);
        }
    }

    Ok(if summary.failed == 0 {
        0
    } else if summary.identified > 0 {
        1
    } else {
        2
    })
}
