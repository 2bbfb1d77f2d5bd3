//! `velocity collect` - synchronous capture run with optional post-run
//! database loading and change archiving.

use anyhow::Context;
use clap::Args;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use velocity_archive::CaptureArchive;
use velocity_collector::{build_jobs, BatchDevice, CollectionOptions, Collector};
use velocity_loader::CaptureLoader;
use velocity_net::{CancellationToken, Ssh2Connector};
use velocity_protocol::{CaptureType, EventSink, JsonLineSink, NullSink, Vendor};

use crate::cli::context::{resolve_credentials, CliContext};
use crate::cli::output;

#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Device selection: `all`, `vendor=cisco_ios`, `site=iad2`, or a
    /// comma-separated hostname list
    #[arg(long)]
    pub devices: String,

    /// Comma-separated capture types (e.g. configs,version,arp)
    #[arg(long)]
    pub types: String,

    #[arg(long, short = 'u')]
    pub username: String,

    /// Password (falls back to CRED_1_PASS)
    #[arg(long, short = 'p')]
    pub password: Option<String>,

    /// Concurrent SSH sessions (1-20)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Per-command timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Skip the post-run database load
    #[arg(long)]
    pub no_load: bool,

    /// Stream progress events and the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Exit codes: 0 all devices succeeded, 1 partial, 2 total failure or
/// configuration error.
pub fn run(args: CollectArgs) -> anyhow::Result<u8> {
    let ctx = CliContext::open(true)?;
    let credentials = resolve_credentials(&args.username, args.password.as_deref())?;
    let types = CaptureType::parse_list(&args.types).map_err(|e| anyhow::anyhow!(e))?;

    let assets = ctx.open_assets()?;
    let devices = ctx
        .runtime
        .block_on(assets.select_devices(&args.devices))
        .context("selecting devices")?;
    if devices.is_empty() {
        anyhow::bail!("device selection '{}' matched nothing", args.devices);
    }

    let batch_devices: Vec<BatchDevice> = devices
        .iter()
        .map(|d| BatchDevice {
            name: d.normalized_name.clone(),
            ip: d
                .management_ip
                .clone()
                .or_else(|| d.ipv4_address.clone())
                .unwrap_or_else(|| d.normalized_name.clone()),
            vendor: d
                .platform
                .as_deref()
                .and_then(|p| Vendor::from_str(p).ok())
                .unwrap_or(Vendor::Unknown),
        })
        .collect();

    let jobs = build_jobs(&batch_devices, &types);
    let options = CollectionOptions {
        max_workers: args.workers.unwrap_or(ctx.config.collection.max_workers),
        connect_timeout: Duration::from_secs(ctx.config.ssh.connect_timeout_secs),
        command_timeout: Duration::from_secs(
            args.timeout.unwrap_or(ctx.config.ssh.command_timeout_secs),
        ),
        job_timeout: (ctx.config.ssh.job_timeout_secs > 0)
            .then(|| Duration::from_secs(ctx.config.ssh.job_timeout_secs)),
        auto_load_db: !args.no_load,
    };

    let sink: Arc<dyn EventSink> = if args.json {
        Arc::new(JsonLineSink::new(std::io::stdout()))
    } else {
        Arc::new(NullSink)
    };

    let collector = Collector::new(Arc::new(Ssh2Connector::new()), ctx.layout.clone());
    let cancel = CancellationToken::new();
    let mut result =
        collector.run_collection(&jobs, &credentials, &options, &cancel, sink)?;

    if options.auto_load_db && !result.succeeded_captures.is_empty() {
        let arp_cat = ctx.open_arp_cat()?;
        let loader = CaptureLoader::new(
            assets.clone(),
            arp_cat,
            ctx.layout.clone(),
            ctx.config.scoring.clone(),
        );
        let archive = CaptureArchive::new(
            assets.clone(),
            ctx.layout.clone(),
            ctx.config.severity.clone(),
        );
        ctx.runtime
            .block_on(collector.load_and_archive(&mut result, &loader, &archive, &assets))
            .context("post-run load")?;
    }

    if args.json {
        let payload = serde_json::json!({
            "success": result.devices_failed == 0,
            "job_id": result.job_id.as_ref().map(|j| j.as_str().to_string()),
            "devices_succeeded": result.devices_succeeded,
            "devices_failed": result.devices_failed,
            "captures_created": result.captures_created.clone(),
            "changes_detected": result.changes_detected,
            "execution_time_secs": result.execution_time_secs,
            "failed_devices": result
                .failed_devices
                .iter()
                .map(|(name, reason)| serde_json::json!({"name": name, "reason": reason}))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "collection finished in {}: {} succeeded, {} failed, {} change(s)",
            output::format_duration_secs(result.execution_time_secs),
            result.devices_succeeded,
            result.devices_failed,
            result.changes_detected,
        );
        let mut table = output::table(&["capture type", "captures"]);
        for (capture_type, count) in &result.captures_created {
            table.add_row(vec![capture_type.clone(), count.to_string()]);
        }
        println!("{}", table);
        if !result.failed_devices.is_empty() {
            let mut table = output::table(&["device", "reason"]);
            for (name, reason) in &result.failed_devices {
                table.add_row(vec![name, reason]);
            }
            println!("{}", table);
        }
    }

    Ok(if result.devices_failed == 0 {
        0
    } else if result.devices_succeeded > 0 {
        1
    } else {
        2
    })
}
