//! Compose descriptor handling and service-topology control.
//!
//! The compose file is the single source of truth for the stack's topology.
//! Save copies it verbatim; load replaces it wholesale and brings the stack
//! up with the new descriptor. Only the `services` map is ever parsed, to
//! find services by image.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::CtlConfig;
use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct ComposeFile {
    #[serde(default)]
    pub services: BTreeMap<String, ComposeService>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComposeService {
    #[serde(default)]
    pub image: Option<String>,
}

impl ComposeFile {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::Compose {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::parse(&text)
    }

    /// Names of declared services whose image starts with the given prefix.
    pub fn services_with_image_prefix(&self, prefix: &str) -> Vec<String> {
        self.services
            .iter()
            .filter(|(_, svc)| {
                svc.image
                    .as_deref()
                    .map(|image| image.starts_with(prefix))
                    .unwrap_or(false)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Replace the live compose descriptor.
///
/// The new content is validated as a compose document before anything is
/// written, and the write itself goes through a temp file plus rename so a
/// failure cannot leave a half-written descriptor.
pub fn write_descriptor(path: &Path, bytes: &[u8]) -> Result<()> {
    let text = std::str::from_utf8(bytes).map_err(|e| Error::Compose {
        reason: format!("descriptor is not valid UTF-8: {}", e),
    })?;
    ComposeFile::parse(text)?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(dir)?;
    fs::write(tmp.path(), bytes)?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    debug!("Wrote compose descriptor to {}", path.display());
    Ok(())
}

/// Service-topology controller consumed by the load pipeline.
pub trait StackController: Send + Sync {
    /// Bring all declared services up, removing orphaned ones.
    fn up(&self) -> Result<()>;

    /// Human-readable status of the running services.
    fn ps(&self) -> Result<String>;
}

/// Shells out to the configured compose binary.
pub struct DockerCompose {
    bin: String,
    compose_file: PathBuf,
}

impl DockerCompose {
    pub fn new(config: &CtlConfig) -> Self {
        Self {
            bin: config.compose_bin.clone(),
            compose_file: config.compose_file.clone(),
        }
    }
}

impl StackController for DockerCompose {
    fn up(&self) -> Result<()> {
        info!("Bringing services up with the new descriptor");
        let status = Command::new(&self.bin)
            .arg("-f")
            .arg(&self.compose_file)
            .args(["up", "-d", "--remove-orphans"])
            .status()
            .map_err(|e| Error::Compose {
                reason: format!("failed to run {}: {}", self.bin, e),
            })?;
        if !status.success() {
            return Err(Error::Compose {
                reason: format!("{} up exited with {}", self.bin, status),
            });
        }
        Ok(())
    }

    fn ps(&self) -> Result<String> {
        let output = Command::new(&self.bin)
            .arg("-f")
            .arg(&self.compose_file)
            .arg("ps")
            .output()
            .map_err(|e| Error::Compose {
                reason: format!("failed to run {}: {}", self.bin, e),
            })?;
        if !output.status.success() {
            return Err(Error::Compose {
                reason: format!("{} ps exited with {}", self.bin, output.status),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
version: '3'
services:
  spark-one:
    image: brewblox/brewblox-devcon-spark:rpi-stable
    ports:
      - \"5000:5000\"
  spark-two:
    image: brewblox/brewblox-devcon-spark:develop
  history:
    image: brewblox/brewblox-history:stable
  datastore:
    image: treehouses/couchdb:2.3.1
";

    #[test]
    fn test_services_with_image_prefix() {
        let compose = ComposeFile::parse(SAMPLE).unwrap();
        assert_eq!(
            compose.services_with_image_prefix("brewblox/brewblox-devcon-spark"),
            vec!["spark-one".to_string(), "spark-two".to_string()]
        );
    }

    #[test]
    fn test_no_matching_services() {
        let compose = ComposeFile::parse(SAMPLE).unwrap();
        assert!(compose
            .services_with_image_prefix("brewblox/world-peace")
            .is_empty());
    }

    #[test]
    fn test_service_without_image_is_skipped() {
        let compose = ComposeFile::parse("services:\n  builder:\n    build: .\n").unwrap();
        assert!(compose.services_with_image_prefix("brewblox/").is_empty());
    }

    #[test]
    fn test_write_descriptor_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docker-compose.yml");

        write_descriptor(&path, SAMPLE.as_bytes()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
    }

    #[test]
    fn test_write_descriptor_rejects_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docker-compose.yml");
        fs::write(&path, "services: {}\n").unwrap();

        let err = write_descriptor(&path, b"services: [not: {valid").unwrap_err();
        assert!(matches!(err, Error::Yaml(_) | Error::Compose { .. }));
        // The live descriptor is untouched.
        assert_eq!(fs::read_to_string(&path).unwrap(), "services: {}\n");
    }
}
