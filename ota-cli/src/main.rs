//! ota: publish iOS builds for over-the-air installation.
//!
//! # Usage
//!
//! ```text
//! ota deploy <artifact> --app-identifier <id> --name <name> --build-version <v>
//!            [--changelog <text>] [--single-page] [--dry-run] [--json] [--base-url <url>]
//! ota upload <SRC=DEST>... [--dry-run] [--json]
//! ota ledger projects [--json]
//! ota ledger builds <name> [--json]
//! ```
//!
//! Global flags: `--config <path>` (default `ota.yaml`), `--verbose`.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{deploy::DeployArgs, ledger::LedgerCommand, upload::UploadArgs};
use ota_core::config::DEFAULT_CONFIG_FILE;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "ota",
    version,
    about = "Publish iOS builds to FTP, S3 or a web directory for over-the-air install",
    long_about = None,
)]
struct Cli {
    /// Publisher configuration file.
    #[arg(long, global = true, env = "OTA_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Debug logging on stderr (overrides RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload an artifact with its install manifest and update the ledgers.
    Deploy(DeployArgs),

    /// Upload local files to arbitrary remote paths.
    Upload(UploadArgs),

    /// Show the remote ledgers.
    Ledger {
        #[command(subcommand)]
        command: LedgerCommand,
    },
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logs go to stderr so stdout carries only results.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Deploy(args) => args.run(&cli.config),
        Commands::Upload(args) => args.run(&cli.config),
        Commands::Ledger { command } => commands::ledger::run(command, &cli.config),
    }
}
