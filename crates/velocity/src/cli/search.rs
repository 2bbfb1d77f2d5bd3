//! `velocity search` - full-text search over capture snapshot history.

use clap::Args;

use crate::cli::context::CliContext;
use crate::cli::output;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// FTS query (supports the usual AND/OR/NEAR and "quoted phrases")
    pub query: String,

    #[arg(long, default_value_t = 50)]
    pub limit: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: SearchArgs) -> anyhow::Result<u8> {
    let ctx = CliContext::open(true)?;
    let assets = ctx.open_assets()?;
    let hits = ctx
        .runtime
        .block_on(assets.search_snapshots(&args.query, args.limit))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else if hits.is_empty() {
        println!("no matches for '{}'", args.query);
    } else {
        let mut table = output::table(&["device", "type", "captured at", "snippet"]);
        for hit in &hits {
            table.add_row(vec![
                hit.device_name.clone(),
                hit.capture_type.clone(),
                hit.captured_at.format("%Y-%m-%d %H:%M").to_string(),
                hit.snippet.replace('\n', " "),
            ]);
        }
        println!("{}", table);
    }
    Ok(0)
}
