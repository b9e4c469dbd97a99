//! Backup archive container.
//!
//! A backup is a plain zip file with Deflate compression. Entry names carry
//! their semantic role: the literal `docker-compose.yml`, one
//! `<db>.datastore.json` per datastore database, and one
//! `<service>.spark.json` per Spark service. Names are classified into
//! [`EntryKind`] once when the archive is opened; unknown names are kept but
//! ignored by the load pipeline so newer archives stay loadable.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::{Error, Result};

pub const COMPOSE_ENTRY: &str = "docker-compose.yml";
pub const DATASTORE_SUFFIX: &str = ".datastore.json";
pub const SPARK_SUFFIX: &str = ".spark.json";

/// Semantic role of an archive entry, derived from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// The compose descriptor, stored verbatim.
    Compose,
    /// A full database dump; carries the database name.
    Datastore(String),
    /// A Spark block export; carries the service name.
    Spark(String),
    /// Anything else. Preserved but never loaded.
    Other,
}

impl EntryKind {
    pub fn classify(name: &str) -> Self {
        if name == COMPOSE_ENTRY {
            EntryKind::Compose
        } else if let Some(db) = name.strip_suffix(DATASTORE_SUFFIX) {
            EntryKind::Datastore(db.to_string())
        } else if let Some(service) = name.strip_suffix(SPARK_SUFFIX) {
            EntryKind::Spark(service.to_string())
        } else {
            EntryKind::Other
        }
    }
}

/// One named entry in an opened archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// Writes a new backup archive.
///
/// All data goes to a temp file in the destination directory; the final name
/// only appears on [`finish`](ArchiveWriter::finish). An aborted save never
/// leaves a file that looks like a complete archive.
pub struct ArchiveWriter {
    zip: ZipWriter<NamedTempFile>,
    dest: PathBuf,
    names: HashSet<String>,
}

impl ArchiveWriter {
    pub fn create(dest: &Path) -> Result<Self> {
        let dir = dest.parent().filter(|p| !p.as_os_str().is_empty());
        let tmp = match dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new_in(".")?,
        };
        debug!("Writing archive to temp file {}", tmp.path().display());
        Ok(Self {
            zip: ZipWriter::new(tmp),
            dest: dest.to_path_buf(),
            names: HashSet::new(),
        })
    }

    fn options() -> SimpleFileOptions {
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
    }

    /// Add a named entry. Duplicate names are rejected.
    pub fn write_entry(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        if !self.names.insert(name.to_string()) {
            return Err(Error::DuplicateEntry {
                name: name.to_string(),
            });
        }
        self.zip.start_file(name, Self::options())?;
        self.zip.write_all(bytes)?;
        Ok(())
    }

    /// Copy a local file into the archive under its base name.
    pub fn write_file(&mut self, local_path: &Path) -> Result<()> {
        let name = local_path
            .file_name()
            .ok_or_else(|| Error::Config {
                reason: format!("not a file path: {}", local_path.display()),
            })?
            .to_string_lossy()
            .to_string();
        let bytes = fs::read(local_path)?;
        self.write_entry(&name, &bytes)
    }

    /// Flush the zip and atomically move it to its final path.
    pub fn finish(self) -> Result<PathBuf> {
        let tmp = self.zip.finish()?;
        tmp.persist(&self.dest).map_err(|e| Error::Io(e.error))?;
        Ok(self.dest)
    }
}

/// Reads an existing backup archive.
#[derive(Debug)]
pub struct ArchiveReader {
    zip: ZipArchive<File>,
    entries: Vec<ArchiveEntry>,
}

impl ArchiveReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ArchiveNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;
        let mut zip = ZipArchive::new(file).map_err(|e| Error::ArchiveCorrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        // Classify every name once, preserving archive order.
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let name = zip.by_index(i)?.name().to_string();
            let kind = EntryKind::classify(&name);
            entries.push(ArchiveEntry { name, kind });
        }

        Ok(Self { zip, entries })
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut entry = self.zip.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => Error::EntryNotFound {
                name: name.to_string(),
            },
            other => Error::Zip(other),
        })?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}
