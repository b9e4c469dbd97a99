//! brewctl - maintenance CLI for the brewing stack
//!
//! Main binary entry point for the command-line interface.

use anyhow::Result;
use brewctl::cli::{backup, services, status, Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // All narration goes to stderr; stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Backup { command } => match command {
            backup::BackupCommands::Save(args) => backup::run_save(args).await?,
            backup::BackupCommands::Load(args) => backup::run_load(args).await?,
        },
        Commands::Status => status::run().await?,
        Commands::ListServices(args) => services::run(args).await?,
    }

    Ok(())
}
