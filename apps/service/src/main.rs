use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod notifier;
mod runtime;

use runtime::Runtime;

/// Periodically probes HTTP endpoints and alerts when they fail or go stale.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/vigil/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the monitor until interrupted
    Run,
    /// Run a single check cycle now and print its report
    Check,
    /// Print the status derived from stored results
    Status,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logger::init();

    let cli = Cli::parse();
    let runtime = Runtime::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => runtime.run().await,
        Command::Check => runtime.check_once(cli.json).await,
        Command::Status => runtime.print_status(cli.json).await,
        Command::Config => {
            println!("{}", runtime.config());
            Ok(())
        }
    }
}
