//! Runtime configuration.
//!
//! All endpoint URLs and paths are resolved once at process start and passed
//! into the pipelines as an immutable struct. Nothing reads environment
//! variables after this point.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::Result;

const DEFAULT_HOST_URL: &str = "https://localhost";
const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";
const DEFAULT_BACKUP_DIR: &str = "backup";
const DEFAULT_SPARK_IMAGE: &str = "brewblox/brewblox-devcon-spark";
const DEFAULT_COMPOSE_BIN: &str = "docker-compose";

#[derive(Debug, Clone)]
pub struct CtlConfig {
    /// Base URL of the stack's gateway, e.g. `https://localhost`.
    pub host_url: String,
    /// Base URL of the document datastore.
    pub datastore_url: String,
    /// Path of the compose descriptor.
    pub compose_file: PathBuf,
    /// Directory where backup archives are written.
    pub backup_dir: PathBuf,
    /// Image prefix identifying Spark device-controller services.
    pub spark_image: String,
    /// Binary used for service-topology commands.
    pub compose_bin: String,
    /// Interval between datastore readiness probes.
    pub wait_interval: Duration,
    /// Maximum number of readiness probes before giving up.
    pub wait_attempts: u32,
}

impl Default for CtlConfig {
    fn default() -> Self {
        let host_url = DEFAULT_HOST_URL.to_string();
        Self {
            datastore_url: format!("{}/datastore", host_url),
            host_url,
            compose_file: PathBuf::from(DEFAULT_COMPOSE_FILE),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            spark_image: DEFAULT_SPARK_IMAGE.to_string(),
            compose_bin: DEFAULT_COMPOSE_BIN.to_string(),
            wait_interval: Duration::from_secs(2),
            wait_attempts: 60,
        }
    }
}

impl CtlConfig {
    /// Build the configuration from `BREWCTL_*` environment variables,
    /// falling back to stack defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = env::var("BREWCTL_HOST_URL") {
            let host = host.trim_end_matches('/').to_string();
            config.datastore_url = format!("{}/datastore", host);
            config.host_url = host;
        }
        if let Ok(url) = env::var("BREWCTL_DATASTORE_URL") {
            config.datastore_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(file) = env::var("BREWCTL_COMPOSE_FILE") {
            config.compose_file = PathBuf::from(file);
        }
        if let Ok(dir) = env::var("BREWCTL_BACKUP_DIR") {
            config.backup_dir = PathBuf::from(dir);
        }
        if let Ok(image) = env::var("BREWCTL_SPARK_IMAGE") {
            config.spark_image = image;
        }
        if let Ok(bin) = env::var("BREWCTL_COMPOSE_BIN") {
            config.compose_bin = bin;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = CtlConfig::default();
        assert_eq!(config.host_url, "https://localhost");
        assert_eq!(config.datastore_url, "https://localhost/datastore");
        assert_eq!(config.compose_file, PathBuf::from("docker-compose.yml"));
        assert_eq!(config.spark_image, "brewblox/brewblox-devcon-spark");
        assert!(config.wait_attempts > 0);
    }
}
