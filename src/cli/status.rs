//! Stack status command.

use crate::compose::{DockerCompose, StackController};
use crate::config::CtlConfig;
use crate::Result;

pub async fn run() -> Result<()> {
    let config = CtlConfig::from_env()?;
    let controller = DockerCompose::new(&config);
    print!("{}", controller.ps()?);
    Ok(())
}
