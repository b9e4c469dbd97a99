//! Error types for brewctl

use thiserror::Error;

/// Main error type for brewctl operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("remote endpoint never became ready: {url}")]
    RemoteUnavailable { url: String },

    #[error("remote request failed with status {status}: {url}")]
    RemoteRequest { status: u16, url: String },

    #[error("backup archive not found: {path}")]
    ArchiveNotFound { path: String },

    #[error("backup archive is not a valid zip file: {path} ({reason})")]
    ArchiveCorrupt { path: String, reason: String },

    #[error("archive entry not found: {name}")]
    EntryNotFound { name: String },

    #[error("archive already contains an entry named {name}")]
    DuplicateEntry { name: String },

    #[error("compose file error: {reason}")]
    Compose { reason: String },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error("operation cancelled by user")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for brewctl operations
pub type Result<T> = std::result::Result<T, Error>;
