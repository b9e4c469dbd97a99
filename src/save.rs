//! Save pipeline: snapshot remote state into a backup archive.
//!
//! Save is strictly read-only against the stack. It enumerates the datastore
//! databases and the Spark services declared in the compose file, then
//! serializes everything into a single zip archive. Any fetch failure aborts
//! the whole save; the archive only appears under its final name once every
//! entry has been written.

use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::archive::{ArchiveWriter, COMPOSE_ENTRY, DATASTORE_SUFFIX, SPARK_SUFFIX};
use crate::compose::ComposeFile;
use crate::config::CtlConfig;
use crate::datastore::{strip_revision, Datastore};
use crate::spark::SparkServices;
use crate::Result;

#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Include the compose descriptor in the archive.
    pub save_compose: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { save_compose: true }
    }
}

pub struct SaveExecutor<'a> {
    config: &'a CtlConfig,
    datastore: &'a dyn Datastore,
    sparks: &'a dyn SparkServices,
}

impl<'a> SaveExecutor<'a> {
    pub fn new(
        config: &'a CtlConfig,
        datastore: &'a dyn Datastore,
        sparks: &'a dyn SparkServices,
    ) -> Self {
        Self {
            config,
            datastore,
            sparks,
        }
    }

    /// Run the save and return the absolute path of the created archive.
    pub async fn run(&self, options: &SaveOptions) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.backup_dir)?;

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M");
        let file = self
            .config
            .backup_dir
            .join(format!("brewblox_backup_{}.zip", stamp));

        self.datastore.wait_ready().await?;
        let dbs = self.datastore.all_dbs().await?;

        let compose = ComposeFile::read(&self.config.compose_file)?;
        let spark_services = compose.services_with_image_prefix(&self.config.spark_image);

        let mut writer = ArchiveWriter::create(&file)?;

        if options.save_compose {
            info!("Exporting {}", self.config.compose_file.display());
            // Always archived under the literal entry name, whatever the
            // configured descriptor is called on disk.
            writer.write_entry(COMPOSE_ENTRY, &fs::read(&self.config.compose_file)?)?;
        }

        info!("Exporting databases: {}", dbs.join(", "));
        for db in &dbs {
            let docs: Vec<_> = self
                .datastore
                .all_docs(db)
                .await?
                .into_iter()
                .map(strip_revision)
                .collect();
            writer.write_entry(&format!("{}{}", db, DATASTORE_SUFFIX), &serde_json::to_vec(&docs)?)?;
        }

        for service in &spark_services {
            info!("Exporting Spark blocks from '{}'", service);
            let payload = self.sparks.export_blocks(service).await?;
            writer.write_entry(&format!("{}{}", service, SPARK_SUFFIX), &payload)?;
        }

        let path = writer.finish()?;
        let path = fs::canonicalize(&path)?;
        info!("Backup written to {}", path.display());
        Ok(path)
    }
}
