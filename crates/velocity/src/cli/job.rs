//! `velocity job` - named recurring collection jobs.
//!
//! Definitions live in assets.db; `job run` executes the stored selection
//! synchronously. Scheduling (cron, systemd timers) stays outside the
//! core - the schedule string is carried for the operator's tooling.

use clap::Subcommand;

use velocity_protocol::CaptureType;

use crate::cli::collect::{self, CollectArgs};
use crate::cli::context::CliContext;
use crate::cli::output;

#[derive(Subcommand, Debug)]
pub enum JobAction {
    /// Create a named job
    Create {
        name: String,
        /// Comma-separated capture types
        #[arg(long)]
        types: String,
        /// Device selection (all, vendor=..., site=..., or hostname list)
        #[arg(long, default_value = "all")]
        devices: String,
        /// Schedule hint (cron expression, informational)
        #[arg(long)]
        schedule: Option<String>,
    },
    /// List jobs
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one job
    Show {
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// Execute a job now
    Run {
        name: String,
        #[arg(long, short = 'u')]
        username: String,
        #[arg(long, short = 'p')]
        password: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Enable a job
    Enable { name: String },
    /// Disable a job
    Disable { name: String },
    /// Delete a job
    Delete { name: String },
}

pub fn action_wants_json(action: &JobAction) -> bool {
    matches!(
        action,
        JobAction::List { json: true }
            | JobAction::Show { json: true, .. }
            | JobAction::Run { json: true, .. }
    )
}

pub fn run(action: JobAction) -> anyhow::Result<u8> {
    match action {
        JobAction::Create {
            name,
            types,
            devices,
            schedule,
        } => {
            let ctx = CliContext::open(true)?;
            let types = CaptureType::parse_list(&types).map_err(|e| anyhow::anyhow!(e))?;
            let assets = ctx.open_assets()?;
            ctx.runtime.block_on(assets.create_job(
                &name,
                &types,
                &devices,
                schedule.as_deref(),
            ))?;
            println!("created job '{}'", name);
            Ok(0)
        }

        JobAction::List { json } => {
            let ctx = CliContext::open(true)?;
            let assets = ctx.open_assets()?;
            let jobs = ctx.runtime.block_on(assets.list_jobs())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&jobs)?);
            } else if jobs.is_empty() {
                println!("no jobs defined");
            } else {
                let mut table =
                    output::table(&["name", "types", "devices", "schedule", "enabled", "last run"]);
                for job in &jobs {
                    table.add_row(vec![
                        job.name.clone(),
                        job.capture_types
                            .iter()
                            .map(|t| t.as_str())
                            .collect::<Vec<_>>()
                            .join(","),
                        job.device_selection.clone(),
                        job.schedule.clone().unwrap_or_default(),
                        job.enabled.to_string(),
                        job.last_run_at
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_else(|| "never".to_string()),
                    ]);
                }
                println!("{}", table);
            }
            Ok(0)
        }

        JobAction::Show { name, json } => {
            let ctx = CliContext::open(true)?;
            let assets = ctx.open_assets()?;
            let job = ctx.runtime.block_on(assets.job_by_name(&name))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&job)?);
            } else {
                println!("name:      {}", job.name);
                println!(
                    "types:     {}",
                    job.capture_types
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(",")
                );
                println!("devices:   {}", job.device_selection);
                println!("schedule:  {}", job.schedule.as_deref().unwrap_or("-"));
                println!("enabled:   {}", job.enabled);
                println!(
                    "last run:  {} ({})",
                    job.last_run_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string()),
                    job.last_run_status.as_deref().unwrap_or("-")
                );
            }
            Ok(0)
        }

        JobAction::Run {
            name,
            username,
            password,
            json,
        } => {
            let ctx = CliContext::open(true)?;
            let assets = ctx.open_assets()?;
            let job = ctx.runtime.block_on(assets.job_by_name(&name))?;
            if !job.enabled {
                anyhow::bail!("job '{}' is disabled", name);
            }
            let types = job
                .capture_types
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(",");
            drop(assets);
            drop(ctx);

            let code = collect::run(CollectArgs {
                devices: job.device_selection.clone(),
                types,
                username,
                password,
                workers: None,
                timeout: None,
                no_load: false,
                json,
            })?;

            let ctx = CliContext::open(true)?;
            let assets = ctx.open_assets()?;
            let status = if code == 0 { "ok" } else { "partial" };
            ctx.runtime.block_on(assets.record_job_run(&name, status))?;
            Ok(code)
        }

        JobAction::Enable { name } => set_enabled(&name, true),
        JobAction::Disable { name } => set_enabled(&name, false),

        JobAction::Delete { name } => {
            let ctx = CliContext::open(true)?;
            let assets = ctx.open_assets()?;
            ctx.runtime.block_on(assets.delete_job(&name))?;
            println!("deleted job '{}'", name);
            Ok(0)
        }
    }
}

fn set_enabled(name: &str, enabled: bool) -> anyhow::Result<u8> {
    let ctx = CliContext::open(true)?;
    let assets = ctx.open_assets()?;
    ctx.runtime.block_on(assets.set_job_enabled(name, enabled))?;
    println!(
        "{} job '{}'",
        if enabled { "enabled" } else { "disabled" },
        name
    );
    Ok(0)
}
