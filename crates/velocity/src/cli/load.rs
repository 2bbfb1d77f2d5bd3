//! `velocity load` - parse existing capture files into the database, then
//! archive the tracked subset.

use anyhow::Context;
use clap::Args;

use velocity_archive::CaptureArchive;
use velocity_loader::CaptureLoader;
use velocity_protocol::CaptureType;

use crate::cli::context::CliContext;
use crate::cli::output;

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Comma-separated capture types; defaults to the whole catalog
    #[arg(long)]
    pub types: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Exit codes: 0 clean, 1 when any file failed to load.
pub fn run(args: LoadArgs) -> anyhow::Result<u8> {
    let ctx = CliContext::open(true)?;
    let types = match &args.types {
        Some(types) => CaptureType::parse_list(types).map_err(|e| anyhow::anyhow!(e))?,
        None => CaptureType::ALL.to_vec(),
    };

    let assets = ctx.open_assets()?;
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

    let (report, changes) = ctx.runtime.block_on(async {
        let report = loader.load_capture_types(&types).await?;

        // Archive pass over the tracked subset of what exists on disk.
        let mut changes = 0usize;
        for capture_type in types.iter().filter(|t| t.is_tracked()) {
            let dir = ctx.layout.capture_dir(*capture_type);
            if !dir.is_dir() {
                continue;
            }
            let mut paths: Vec<_> = std::fs::read_dir(&dir)
                .context("listing capture directory")?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("txt"))
                .collect();
            paths.sort();
            for path in paths {
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let Some(device) = assets.find_device(stem).await? else {
                    continue;
                };
                let mtime = std::fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .map(chrono::DateTime::<chrono::Utc>::from)
                    .unwrap_or_else(|_| chrono::Utc::now());
                let outcome = archive
                    .archive_file(device.id, *capture_type, &path, mtime)
                    .await?;
                if outcome.is_change() {
                    changes += 1;
                }
            }
        }
        anyhow::Ok((report, changes))
    })?;

    if args.json {
        let payload = serde_json::json!({
            "success": report.files_failed == 0,
            "files_processed": report.files_processed,
            "entries_loaded": report.entries_loaded,
            "files_failed": report.files_failed,
            "changes_detected": changes,
            "reasons": report.reasons,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "loaded {} files ({} entries), {} failed, {} change(s) detected",
            report.files_processed, report.entries_loaded, report.files_failed, changes
        );
        if !report.reasons.is_empty() {
            let mut table = output::table(&["file", "vendor", "best template", "score", "reason"]);
            for failure in &report.reasons {
                table.add_row(vec![
                    failure.file.clone(),
                    failure.vendor.clone().unwrap_or_default(),
                    failure.best_template.clone().unwrap_or_default(),
                    format!("{:.1}", failure.best_score),
                    failure.reason.clone(),
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(if report.files_failed == 0 { 0 } else { 1 })
}
