//! `velocity changes` - recent change records.

use clap::Args;

use crate::cli::context::CliContext;
use crate::cli::output;

#[derive(Args, Debug)]
pub struct ChangesArgs {
    /// Hours of history to show
    #[arg(long, default_value_t = 24)]
    pub hours: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ChangesArgs) -> anyhow::Result<u8> {
    let ctx = CliContext::open(true)?;
    let assets = ctx.open_assets()?;

    let rows = ctx.runtime.block_on(async {
        let changes = assets.recent_changes(args.hours).await?;
        let mut rows = Vec::with_capacity(changes.len());
        for change in changes {
            let device = assets
                .device_by_id(change.device_id)
                .await?
                .map(|d| d.name)
                .unwrap_or_else(|| format!("device#{}", change.device_id));
            rows.push((device, change));
        }
        anyhow::Ok(rows)
    })?;

    if args.json {
        let payload: Vec<_> = rows
            .iter()
            .map(|(device, c)| {
                serde_json::json!({
                    "device": device,
                    "capture_type": c.capture_type.as_str(),
                    "detected_at": c.detected_at.to_rfc3339(),
                    "lines_added": c.lines_added,
                    "lines_removed": c.lines_removed,
                    "severity": c.severity.as_str(),
                    "diff_path": c.diff_path,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if rows.is_empty() {
        println!("no changes in the last {} hours", args.hours);
    } else {
        let mut table = output::table(&["detected", "device", "type", "+/-", "severity"]);
        for (device, change) in &rows {
            table.add_row(vec![
                comfy_table::Cell::new(change.detected_at.format("%Y-%m-%d %H:%M")),
                comfy_table::Cell::new(device),
                comfy_table::Cell::new(change.capture_type.as_str()),
                comfy_table::Cell::new(format!("+{}/-{}", change.lines_added, change.lines_removed)),
                output::severity_cell(change.severity.as_str()),
            ]);
        }
        println!("{}", table);
    }
    Ok(0)
}
