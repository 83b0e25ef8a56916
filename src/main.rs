//! REPL harness - scripted end-to-end testing for line-oriented REPL programs
//!
//! Launches a program such as the `db` storage engine, feeds it commands
//! through its stdin and compares what it prints against expected
//! transcripts.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use repl_harness::common::{logging, Config};
use repl_harness::{cli, commands};

#[derive(Parser)]
#[command(name = "repl-harness", about = "Scripted test harness for REPL programs")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    // Initialize logging
    let guard = logging::init_cli(cli.verbose, config.logging.file_path().as_deref());

    let result = cli::dispatch(cli.command, &config, cli.verbose).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        drop(guard);
        std::process::exit(1);
    }
}
