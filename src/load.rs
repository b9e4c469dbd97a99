//! Load pipeline: replay a backup archive against the running stack.
//!
//! Load is the destructive half of backup. The compose descriptor is
//! replaced wholesale and the stack brought up with it, datastore databases
//! are dropped and rebuilt from the archived documents, and Spark block
//! exports are imported into their services. There is no rollback; every
//! step is idempotent or additive, so re-running the same load converges to
//! the same end state.
//!
//! Failure policy: a missing or corrupt archive and a datastore that never
//! becomes ready are fatal and abort the remaining steps. Failures scoped to
//! one database or one Spark service are logged, collected in the
//! [`LoadReport`] and do not stop the other entities.

use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::archive::{ArchiveReader, EntryKind};
use crate::compose::{self, StackController};
use crate::config::CtlConfig;
use crate::datastore::{strip_revision, Datastore};
use crate::spark::SparkServices;
use crate::Result;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub load_compose: bool,
    pub load_datastore: bool,
    pub load_spark: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            load_compose: true,
            load_datastore: true,
            load_spark: true,
        }
    }
}

/// Outcome of a load run. Warnings are collected here instead of failing
/// the command.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

impl LoadReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

pub struct LoadExecutor<'a> {
    config: &'a CtlConfig,
    datastore: &'a dyn Datastore,
    sparks: &'a dyn SparkServices,
    controller: &'a dyn StackController,
}

impl<'a> LoadExecutor<'a> {
    pub fn new(
        config: &'a CtlConfig,
        datastore: &'a dyn Datastore,
        sparks: &'a dyn SparkServices,
        controller: &'a dyn StackController,
    ) -> Self {
        Self {
            config,
            datastore,
            sparks,
            controller,
        }
    }

    pub async fn run(&self, archive: &Path, options: &LoadOptions) -> Result<LoadReport> {
        let mut reader = ArchiveReader::open(archive)?;
        let mut report = LoadReport::default();

        let mut compose_entry = None;
        let mut datastore_entries = Vec::new();
        let mut spark_entries = Vec::new();
        for entry in reader.entries() {
            match &entry.kind {
                EntryKind::Compose => compose_entry = Some(entry.name.clone()),
                EntryKind::Datastore(db) => {
                    datastore_entries.push((entry.name.clone(), db.clone()))
                }
                EntryKind::Spark(service) => {
                    spark_entries.push((entry.name.clone(), service.clone()))
                }
                EntryKind::Other => {}
            }
        }

        if options.load_compose {
            self.load_compose(&mut reader, compose_entry, &mut report)?;
        }

        if options.load_datastore {
            self.load_datastore(&mut reader, &datastore_entries, &mut report)
                .await?;
        }

        if options.load_spark {
            self.load_spark(&mut reader, &spark_entries, &mut report)
                .await;
        }

        Ok(report)
    }

    /// Overwrite the compose descriptor and reconcile the service topology.
    /// An archive without a compose entry is fine; a failure while applying
    /// a present entry is fatal, since a half-replaced topology is not an
    /// entity that later steps can work around.
    fn load_compose(
        &self,
        reader: &mut ArchiveReader,
        entry: Option<String>,
        report: &mut LoadReport,
    ) -> Result<()> {
        let Some(name) = entry else {
            info!("docker-compose.yml not found in backup archive");
            report.skipped.push("docker-compose.yml".to_string());
            return Ok(());
        };

        info!("Writing {}", self.config.compose_file.display());
        let bytes = reader.read_entry(&name)?;
        compose::write_descriptor(&self.config.compose_file, &bytes)?;
        self.controller.up()?;
        report.applied.push(name);
        Ok(())
    }

    async fn load_datastore(
        &self,
        reader: &mut ArchiveReader,
        entries: &[(String, String)],
        report: &mut LoadReport,
    ) -> Result<()> {
        if entries.is_empty() {
            info!("No datastore files found in backup archive");
            report.skipped.push("datastore".to_string());
            return Ok(());
        }

        // A store that never comes up dooms every remaining destructive
        // step, so this failure is fatal.
        self.datastore.wait_ready().await?;

        for (name, db) in entries {
            match self.restore_db(reader, name, db).await {
                Ok(count) => {
                    info!("Restored database {} ({} documents)", db, count);
                    report.applied.push(name.clone());
                }
                Err(e) => {
                    warn!("Failed to restore database {}: {}", db, e);
                    report.failed.push(name.clone());
                }
            }
        }
        Ok(())
    }

    async fn restore_db(
        &self,
        reader: &mut ArchiveReader,
        name: &str,
        db: &str,
    ) -> Result<usize> {
        let bytes = reader.read_entry(name)?;
        let docs: Vec<Value> = serde_json::from_slice(&bytes)?;
        // Archives written by save are already stripped; hand-edited ones
        // may not be, and a stale stamp would be rejected as a conflict.
        let docs: Vec<Value> = docs.into_iter().map(strip_revision).collect();

        info!("Recreating database {}", db);
        self.datastore.delete_db(db).await?;
        self.datastore.create_db(db).await?;
        self.datastore.insert_docs(db, &docs).await?;
        Ok(docs.len())
    }

    async fn load_spark(
        &self,
        reader: &mut ArchiveReader,
        entries: &[(String, String)],
        report: &mut LoadReport,
    ) {
        if entries.is_empty() {
            info!("No Spark files found in backup archive");
            report.skipped.push("spark".to_string());
            return;
        }

        for (name, service) in entries {
            let result = async {
                let payload = reader.read_entry(name)?;
                info!("Writing blocks to Spark service {}", service);
                self.sparks.import_blocks(service, &payload).await
            }
            .await;

            match result {
                Ok(()) => report.applied.push(name.clone()),
                Err(e) => {
                    warn!("Failed to write blocks to {}: {}", service, e);
                    report.failed.push(name.clone());
                }
            }
        }
    }
}
