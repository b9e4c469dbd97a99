//! Backup save/load commands.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use tracing::{info, warn};

use crate::compose::DockerCompose;
use crate::config::CtlConfig;
use crate::datastore::HttpDatastore;
use crate::load::{LoadExecutor, LoadOptions};
use crate::prompt::{AlwaysConfirm, Confirmer, StdinConfirmer};
use crate::save::{SaveExecutor, SaveOptions};
use crate::spark::HttpSparkClient;
use crate::{Error, Result};

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a backup of the stack's settings
    Save(SaveArgs),
    /// Load and apply a settings backup
    Load(LoadArgs),
}

/// Arguments for `backup save`.
///
/// The archive lands in the backup directory, named with the current date
/// and time. The absolute archive path is the command's only stdout output,
/// so it can be captured by scripts.
#[derive(Args)]
pub struct SaveArgs {
    /// Include docker-compose.yml in the backup (default)
    #[arg(long, overrides_with = "no_save_compose")]
    save_compose: bool,

    /// Do not include docker-compose.yml in the backup
    #[arg(long, overrides_with = "save_compose")]
    no_save_compose: bool,
}

impl SaveArgs {
    pub fn save_compose(&self) -> bool {
        !self.no_save_compose
    }
}

/// Arguments for `backup load`.
///
/// Loading does not merge: the compose file, datastore databases, and Spark
/// blocks present in the archive overwrite their live counterparts. Spark
/// services and databases not mentioned in the archive are left alone.
#[derive(Args)]
pub struct LoadArgs {
    /// Path of the backup archive
    pub archive: PathBuf,

    /// Load and write docker-compose.yml (default)
    #[arg(long, overrides_with = "no_load_compose")]
    load_compose: bool,
    /// Skip docker-compose.yml
    #[arg(long, overrides_with = "load_compose")]
    no_load_compose: bool,

    /// Load and write datastore databases (default)
    #[arg(long, overrides_with = "no_load_datastore")]
    load_datastore: bool,
    /// Skip datastore databases
    #[arg(long, overrides_with = "load_datastore")]
    no_load_datastore: bool,

    /// Load and write Spark blocks (default)
    #[arg(long, overrides_with = "no_load_spark")]
    load_spark: bool,
    /// Skip Spark blocks
    #[arg(long, overrides_with = "load_spark")]
    no_load_spark: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl LoadArgs {
    pub fn options(&self) -> LoadOptions {
        LoadOptions {
            load_compose: !self.no_load_compose,
            load_datastore: !self.no_load_datastore,
            load_spark: !self.no_load_spark,
        }
    }
}

pub async fn run_save(args: SaveArgs) -> Result<()> {
    let config = CtlConfig::from_env()?;
    let datastore = HttpDatastore::new(&config)?;
    let sparks = HttpSparkClient::new(&config)?;

    let executor = SaveExecutor::new(&config, &datastore, &sparks);
    let path = executor
        .run(&SaveOptions {
            save_compose: args.save_compose(),
        })
        .await?;

    // The archive path is the only machine-readable output.
    println!("{}", path.display());
    info!("Done!");
    Ok(())
}

pub async fn run_load(args: LoadArgs) -> Result<()> {
    let config = CtlConfig::from_env()?;

    let confirmer: Box<dyn Confirmer> = if args.yes || !std::io::stdin().is_terminal() {
        Box::new(AlwaysConfirm)
    } else {
        Box::new(StdinConfirmer)
    };
    if !confirmer.confirm("This will overwrite settings on the running stack. Continue?")? {
        return Err(Error::Cancelled);
    }

    let datastore = HttpDatastore::new(&config)?;
    let sparks = HttpSparkClient::new(&config)?;
    let controller = DockerCompose::new(&config);

    let executor = LoadExecutor::new(&config, &datastore, &sparks, &controller);
    let report = executor.run(&args.archive, &args.options()).await?;

    for name in &report.skipped {
        info!("Skipped: {}", name);
    }
    if report.has_failures() {
        // Per-entity failures do not change the exit code. Completed steps
        // stay applied; re-running the load with the same archive is safe.
        warn!("Completed with failures: {}", report.failed.join(", "));
    } else {
        info!("Done!");
    }
    Ok(())
}
