#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the vendor map scan pipeline.
//!
//! Uses `indicatif-log-bridge` (via [`vendor_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the scan bar never fight for the terminal.

mod dataset;
mod scan;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use vendor_map_scan::registry::{find_definition, load_definition, validate};
use vendor_map_scan_models::ScanDefinition;

#[derive(Parser)]
#[command(name = "vendor_map", about = "Street vendor imagery scanner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Which scan to operate on: a built-in id or a definition file.
#[derive(Args)]
struct ScanTarget {
    /// Built-in scan id (see `scans`)
    #[arg(required_unless_present = "config", conflicts_with = "config")]
    scan: Option<String>,
    /// Path to a scan definition TOML file
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ScanTarget {
    fn resolve(&self) -> Result<ScanDefinition, Box<dyn std::error::Error>> {
        if let Some(path) = &self.config {
            return Ok(load_definition(path)?);
        }

        let id = self.scan.as_deref().unwrap_or_default();
        let definition =
            find_definition(id).ok_or_else(|| format!("Unknown scan '{id}' (see `scans`)"))?;
        validate(&definition)?;
        Ok(definition)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in scan definitions
    Scans,
    /// Show candidates, resume state and worst-case spend without calling
    /// any imagery or detection provider
    Plan {
        #[command(flatten)]
        target: ScanTarget,
    },
    /// Run a scan
    Scan {
        #[command(flatten)]
        target: ScanTarget,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
        /// Lower the budget cap for this run
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Summarize a scan's ledger
    Status {
        #[command(flatten)]
        target: ScanTarget,
    },
    /// Build the enriched dataset from a ledger
    Dataset(dataset::DatasetArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = vendor_map_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scans => scan::list(),
        Commands::Plan { target } => scan::plan(&target.resolve()?).await?,
        Commands::Scan { target, yes, limit } => {
            scan::run(target.resolve()?, yes, limit, &multi).await?;
        }
        Commands::Status { target } => scan::status(&target.resolve()?)?,
        Commands::Dataset(args) => dataset::run(&args).await?,
    }

    Ok(())
}
