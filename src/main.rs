use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use navsync::cli::setup::setup;
use navsync::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Append new NAV records for every configured fund
    Sync {
        /// Request full history instead of the latest NAV
        #[arg(long)]
        full: bool,
    },
    /// Delete all stored NAV records and reload full history
    Load,
    /// Write the master table snapshots from the store
    Export,
    /// Run the daily pipeline: sync, export and report stages
    Run,
}

impl From<Commands> for navsync::AppCommand {
    fn from(cmd: Commands) -> navsync::AppCommand {
        match cmd {
            Commands::Sync { full } => navsync::AppCommand::Sync { full },
            Commands::Load => navsync::AppCommand::Load,
            Commands::Export => navsync::AppCommand::Export,
            Commands::Run => navsync::AppCommand::Run,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => navsync::cli::setup::setup_at_path(path),
            None => setup(),
        },
        Some(cmd) => navsync::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
