//! `velocity discover` - synchronous discovery crawl.

use clap::Args;
use std::sync::Arc;
use std::time::Duration;

use velocity_discovery::{Crawler, DiscoveryError, DiscoveryOptions};
use velocity_net::Ssh2Connector;
use velocity_protocol::{EventSink, JsonLineSink, NullSink};

use crate::cli::context::{resolve_credentials, CliContext};
use crate::cli::output;

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Seed IP address to start the CDP/LLDP crawl from
    #[arg(long)]
    pub seed: String,

    #[arg(long, short = 'u')]
    pub username: String,

    /// Password (falls back to CRED_1_PASS)
    #[arg(long, short = 'p')]
    pub password: Option<String>,

    /// Site name used for the inventory folder
    #[arg(long, default_value = "network")]
    pub site: String,

    /// BFS depth limit (default: unlimited)
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Maximum devices to visit
    #[arg(long, default_value_t = 100)]
    pub max_devices: usize,

    /// Stream progress events and the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Exit codes: 0 ok, 1 seed unreachable, 2 auth failure.
pub fn run(args: DiscoverArgs) -> anyhow::Result<u8> {
    let ctx = CliContext::open(true)?;
    let credentials = resolve_credentials(&args.username, args.password.as_deref())?;

    let options = DiscoveryOptions {
        site_name: args.site.clone(),
        max_depth: args.max_depth,
        max_devices: args.max_devices,
        connect_timeout: Duration::from_secs(ctx.config.ssh.connect_timeout_secs),
        command_timeout: Duration::from_secs(ctx.config.ssh.command_timeout_secs),
    };

    let sink: Arc<dyn EventSink> = if args.json {
        Arc::new(JsonLineSink::new(std::io::stdout()))
    } else {
        Arc::new(NullSink)
    };

    let crawler = Crawler::new(Arc::new(Ssh2Connector::new()));
    let report = match crawler.discover(&args.seed, &credentials, &options, &ctx.layout, sink.as_ref())
    {
        Ok(report) => report,
        Err(DiscoveryError::SeedUnreachable { ip, reason }) => {
            eprintln!("seed {} unreachable: {}", ip, reason);
            return Ok(1);
        }
        Err(DiscoveryError::SeedAuthFailed { ip, reason }) => {
            eprintln!("authentication to seed {} failed: {}", ip, reason);
            return Ok(2);
        }
        Err(err) => return Err(err.into()),
    };

    if args.json {
        let payload = serde_json::json!({
            "success": true,
            "job_id": report.job_id.as_str(),
            "device_count": report.device_count,
            "inventory_path": report.inventory_path,
            "topology_path": report.topology_path,
            "failed_peers": report
                .failed_peers
                .iter()
                .map(|p| serde_json::json!({"name": p.name, "ip": p.ip, "reason": p.reason}))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "discovered {} devices ({} peers failed)",
            report.device_count,
            report.failed_peers.len()
        );
        println!("inventory: {}", report.inventory_path.display());
        println!("topology:  {}", report.topology_path.display());
        if !report.failed_peers.is_empty() {
            let mut table = output::table(&["peer", "ip", "reason"]);
            for peer in &report.failed_peers {
                table.add_row(vec![&peer.name, &peer.ip, &peer.reason]);
            }
            println!("{}", table);
        }
    }
    Ok(0)
}
