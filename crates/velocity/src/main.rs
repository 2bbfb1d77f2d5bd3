//! velocity - network CMDB core CLI.
//!
//! Discovery, fingerprinting, capture collection, change tracking and
//! history search over a single data directory. The web dashboard is a
//! separate deliverable that consumes the same stores and event protocol.

use clap::{Parser, Subcommand};
use std::process::ExitCode;

mod cli;
mod logging;

#[derive(Parser, Debug)]
#[command(name = "velocity", version, about = "Network configuration-management database")]
struct Cli {
    /// Verbose logging to stderr (or set RUST_LOG).
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the data directory, databases and default admin account
    Init {
        /// Re-initialize an existing data directory
        #[arg(long)]
        force: bool,
    },

    /// Discover devices via CDP/LLDP BFS from a seed IP
    Discover(cli::discover::DiscoverArgs),

    /// Fingerprint inventory devices (platform, model, version, serial)
    Fingerprint(cli::fingerprint::FingerprintArgs),

    /// Run a capture collection across selected devices
    Collect(cli::collect::CollectArgs),

    /// Parse existing capture files into the database, then archive
    /// tracked types
    Load(cli::load::LoadArgs),

    /// Full-text search across capture snapshot history
    Search(cli::search::SearchArgs),

    /// Show recent change records
    Changes(cli::changes::ChangesArgs),

    /// Manage named recurring collection jobs
    Job {
        #[command(subcommand)]
        action: cli::job::JobAction,
    },

    /// Show resolved paths and configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Discover(args) => args.json,
        Commands::Fingerprint(args) => args.json,
        Commands::Collect(args) => args.json,
        Commands::Load(args) => args.json,
        Commands::Search(args) => args.json,
        Commands::Changes(args) => args.json,
        Commands::Job { action } => cli::job::action_wants_json(action),
        Commands::Config { json } => *json,
        Commands::Init { .. } => false,
    }
}

fn run_command(cli: Cli) -> anyhow::Result<u8> {
    match cli.command {
        Commands::Init { force } => cli::init::run(force),
        Commands::Discover(args) => cli::discover::run(args),
        Commands::Fingerprint(args) => cli::fingerprint::run(args),
        Commands::Collect(args) => cli::collect::run(args),
        Commands::Load(args) => cli::load::run(args),
        Commands::Search(args) => cli::search::run(args),
        Commands::Changes(args) => cli::changes::run(args),
        Commands::Job { action } => cli::job::run(action),
        Commands::Config { json } => cli::config::run(json),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // JSON modes log to stderr so stdout stays machine-readable.
    let json_mode = command_wants_json(&cli.command);
    if let Err(err) = logging::init(cli.verbose, json_mode) {
        eprintln!("warning: logging init failed: {:#}", err);
    }

    match run_command(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            if json_mode {
                let payload = serde_json::json!({
                    "success": false,
                    "error": format!("{:#}", err),
                });
                println!("{}", payload);
            } else {
                eprintln!("error: {:#}", err);
            }
            ExitCode::from(2)
        }
    }
}
