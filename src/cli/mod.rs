//! Command-line interface for brewctl.

use clap::{Parser, Subcommand};

pub mod backup;
pub mod services;
pub mod status;

/// brewctl - configuration and maintenance CLI for the brewing stack
#[derive(Parser)]
#[command(name = "brewctl")]
#[command(about = "Configuration and maintenance CLI for a containerized brewing automation stack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Save or load backups
    Backup {
        #[command(subcommand)]
        command: backup::BackupCommands,
    },
    /// Check system status
    Status,
    /// List all services of a specific type
    ListServices(services::ListServicesArgs),
}
