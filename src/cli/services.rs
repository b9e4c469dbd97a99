//! Service inventory command.

use std::path::PathBuf;

use clap::Args;

use crate::compose::ComposeFile;
use crate::config::CtlConfig;
use crate::Result;

/// Arguments for `list-services`.
#[derive(Args)]
pub struct ListServicesArgs {
    /// Image prefix to match services against
    #[arg(long)]
    pub image: Option<String>,

    /// Compose file to read
    #[arg(long)]
    pub file: Option<PathBuf>,
}

pub async fn run(args: ListServicesArgs) -> Result<()> {
    let config = CtlConfig::from_env()?;
    let image = args.image.unwrap_or(config.spark_image);
    let file = args.file.unwrap_or(config.compose_file);

    let compose = ComposeFile::read(&file)?;
    for service in compose.services_with_image_prefix(&image) {
        println!("{}", service);
    }
    Ok(())
}
