//! # brewctl
//!
//! Configuration and maintenance CLI for a containerized home-brewing
//! automation stack: a document datastore, Spark device-controller services,
//! and the compose file that ties them together.
//!
//! The core of the crate is the backup pipeline. [`save::SaveExecutor`]
//! snapshots the distributed state into a single zip archive;
//! [`load::LoadExecutor`] selectively replays an archive against the running
//! stack. Remote state is only reached through the capability traits in
//! [`datastore`], [`spark`], and [`compose`], so the pipelines can be tested
//! without a live stack.

pub mod archive;
pub mod cli;
pub mod compose;
pub mod config;
pub mod datastore;
pub mod error;
pub mod load;
pub mod prompt;
pub mod save;
pub mod spark;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{Error, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
