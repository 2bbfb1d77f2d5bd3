//! `velocity init` - create the data directory, databases and the default
//! admin account.

use anyhow::Context;
use tracing::info;

use crate::cli::context::CliContext;

/// Exit codes: 0 created, 1 already initialized (without --force),
/// 2 on I/O or database errors (via the error path).
pub fn run(force: bool) -> anyhow::Result<u8> {
    let ctx = CliContext::open(false)?;

    if ctx.layout.is_initialized() && !force {
        eprintln!(
            "data directory {} already initialized (use --force to re-run)",
            ctx.layout.base().display()
        );
        return Ok(1);
    }

    ctx.layout
        .ensure_layout()
        .with_context(|| format!("creating layout under {}", ctx.layout.base().display()))?;

    // Opening creates schemas; all three are idempotent.
    let assets = ctx.open_assets()?;
    ctx.open_arp_cat()?;
    let users = ctx.open_users()?;

    ctx.runtime.block_on(async {
        // Reference rows for the supported platforms.
        for vendor in velocity_protocol::Vendor::ALL {
            assets.get_or_create_vendor(vendor.display_name()).await?;
        }
        anyhow::Ok(())
    })?;

    let seeded = ctx
        .runtime
        .block_on(users.seed_default_admin("changeme"))
        .context("seeding default admin")?;
    if seeded {
        println!("created default admin user 'admin' (password 'changeme' - change it)");
    }

    info!(data_dir = %ctx.layout.base().display(), "initialized data directory");
    println!("initialized {}", ctx.layout.base().display());
    Ok(0)
}
