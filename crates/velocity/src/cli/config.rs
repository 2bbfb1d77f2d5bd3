//! `velocity config` - show resolved paths and effective configuration.

use crate::cli::context::CliContext;

pub fn run(json: bool) -> anyhow::Result<u8> {
    let ctx = CliContext::open(false)?;

    if json {
        let payload = serde_json::json!({
            "data_dir": ctx.layout.base(),
            "assets_db": ctx.layout.assets_db(),
            "arp_cat_db": ctx.layout.arp_cat_db(),
            "users_db": ctx.layout.users_db(),
            "config_file": ctx.layout.config_file(),
            "capture_root": ctx.layout.capture_root(),
            "diffs_root": ctx.layout.diffs_root(),
            "initialized": ctx.layout.is_initialized(),
            "config": {
                "ssh": {
                    "connect_timeout_secs": ctx.config.ssh.connect_timeout_secs,
                    "command_timeout_secs": ctx.config.ssh.command_timeout_secs,
                },
                "collection": {
                    "max_workers": ctx.config.collection.max_workers,
                    "fingerprint_workers": ctx.config.collection.fingerprint_workers,
                },
                "severity": {
                    "configs_critical": ctx.config.severity.configs_critical,
                    "inventory_critical": ctx.config.severity.inventory_critical,
                },
            },
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("data dir:    {}", ctx.layout.base().display());
        println!("assets db:   {}", ctx.layout.assets_db().display());
        println!("arp cat db:  {}", ctx.layout.arp_cat_db().display());
        println!("users db:    {}", ctx.layout.users_db().display());
        println!("config file: {}", ctx.layout.config_file().display());
        println!("initialized: {}", ctx.layout.is_initialized());
        println!(
            "ssh timeouts: connect {}s, command {}s",
            ctx.config.ssh.connect_timeout_secs, ctx.config.ssh.command_timeout_secs
        );
        println!(
            "workers: collection {}, fingerprint {}",
            ctx.config.collection.max_workers, ctx.config.collection.fingerprint_workers
        );
    }
    Ok(0)
}
