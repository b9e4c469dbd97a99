//! Datastore capability of the remote state client.
//!
//! The datastore is a CouchDB-style document store: named databases of JSON
//! documents, each stamped with a store-assigned `_rev`. The pipelines only
//! talk to it through the [`Datastore`] trait so tests can substitute an
//! in-memory store.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::CtlConfig;
use crate::{Error, Result};

/// Database names with this prefix belong to the store engine itself and are
/// never backed up.
pub const RESERVED_PREFIX: char = '_';

pub fn is_reserved(db: &str) -> bool {
    db.starts_with(RESERVED_PREFIX)
}

/// Remove the store-assigned revision stamp from a document.
///
/// Revisions must not be replayed: bulk-inserting a document that still
/// carries a stale `_rev` is rejected as a conflict.
pub fn strip_revision(mut doc: Value) -> Value {
    if let Some(obj) = doc.as_object_mut() {
        obj.remove("_rev");
    }
    doc
}

#[async_trait]
pub trait Datastore: Send + Sync {
    /// Block until the store answers, or fail with
    /// [`Error::RemoteUnavailable`] once the attempt bound expires.
    async fn wait_ready(&self) -> Result<()>;

    /// All user database names. Reserved names are already filtered out.
    async fn all_dbs(&self) -> Result<Vec<String>>;

    /// Every document in a database, in store order, revision stamps intact.
    async fn all_docs(&self, db: &str) -> Result<Vec<Value>>;

    /// Delete a database. A database that is already absent counts as
    /// success.
    async fn delete_db(&self, db: &str) -> Result<()>;

    async fn create_db(&self, db: &str) -> Result<()>;

    /// Bulk-insert documents. Documents must not carry `_rev`; the store
    /// assigns fresh revisions.
    async fn insert_docs(&self, db: &str, docs: &[Value]) -> Result<()>;
}

#[derive(Deserialize)]
struct AllDocsResponse {
    rows: Vec<AllDocsRow>,
}

#[derive(Deserialize)]
struct AllDocsRow {
    doc: Value,
}

/// HTTP implementation against the real datastore endpoint.
pub struct HttpDatastore {
    client: reqwest::Client,
    base_url: String,
    wait_interval: std::time::Duration,
    wait_attempts: u32,
}

impl HttpDatastore {
    /// The stack serves its local endpoints with a self-signed certificate,
    /// so certificate verification is disabled.
    pub fn new(config: &CtlConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            client,
            base_url: config.datastore_url.clone(),
            wait_interval: config.wait_interval,
            wait_attempts: config.wait_attempts,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Map a non-2xx response to [`Error::RemoteRequest`].
fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(Error::RemoteRequest {
            status: status.as_u16(),
            url: resp.url().to_string(),
        })
    }
}

#[async_trait]
impl Datastore for HttpDatastore {
    async fn wait_ready(&self) -> Result<()> {
        info!("Waiting for the datastore at {}", self.base_url);
        for attempt in 1..=self.wait_attempts {
            match self.client.get(&self.base_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!("Datastore ready after {} attempt(s)", attempt);
                    return Ok(());
                }
                Ok(resp) => debug!("Datastore not ready yet: status {}", resp.status()),
                Err(e) => debug!("Datastore not reachable yet: {}", e),
            }
            // No sleep after the last probe; fail as soon as the bound is hit.
            if attempt < self.wait_attempts {
                tokio::time::sleep(self.wait_interval).await;
            }
        }
        Err(Error::RemoteUnavailable {
            url: self.base_url.clone(),
        })
    }

    async fn all_dbs(&self) -> Result<Vec<String>> {
        let resp = check_status(self.client.get(self.url("_all_dbs")).send().await?)?;
        let names: Vec<String> = resp.json().await?;
        Ok(names.into_iter().filter(|db| !is_reserved(db)).collect())
    }

    async fn all_docs(&self, db: &str) -> Result<Vec<Value>> {
        let url = self.url(&format!("{}/_all_docs", db));
        let resp = check_status(
            self.client
                .get(&url)
                .query(&[("include_docs", "true")])
                .send()
                .await?,
        )?;
        let body: AllDocsResponse = resp.json().await?;
        Ok(body.rows.into_iter().map(|row| row.doc).collect())
    }

    async fn delete_db(&self, db: &str) -> Result<()> {
        let resp = self.client.delete(self.url(db)).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("Database {} was already absent", db);
            return Ok(());
        }
        check_status(resp)?;
        Ok(())
    }

    async fn create_db(&self, db: &str) -> Result<()> {
        check_status(self.client.put(self.url(db)).send().await?)?;
        Ok(())
    }

    async fn insert_docs(&self, db: &str, docs: &[Value]) -> Result<()> {
        let url = self.url(&format!("{}/_bulk_docs", db));
        let body = serde_json::json!({ "docs": docs });
        check_status(self.client.post(&url).json(&body).send().await?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved("_users"));
        assert!(is_reserved("_replicator"));
        assert!(!is_reserved("brewery"));
    }

    #[test]
    fn test_strip_revision() {
        let doc = json!({"_id": "a", "_rev": "1-abc", "n": 1});
        assert_eq!(strip_revision(doc), json!({"_id": "a", "n": 1}));
    }

    #[test]
    fn test_strip_revision_without_stamp() {
        let doc = json!({"_id": "a", "n": 1});
        assert_eq!(strip_revision(doc.clone()), doc);
    }

    #[test]
    fn test_strip_revision_non_object() {
        let doc = json!([1, 2, 3]);
        assert_eq!(strip_revision(doc.clone()), doc);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_ready_gives_up_without_a_trailing_sleep() {
        use std::time::Duration;

        // Nothing listens on port 1, so every probe fails immediately.
        let config = CtlConfig {
            datastore_url: "http://127.0.0.1:1".to_string(),
            wait_interval: Duration::from_millis(100),
            wait_attempts: 3,
            ..CtlConfig::default()
        };
        let store = HttpDatastore::new(&config).unwrap();

        let start = tokio::time::Instant::now();
        let err = store.wait_ready().await.unwrap_err();
        assert!(matches!(err, Error::RemoteUnavailable { .. }));

        // Three probes are separated by exactly two sleep intervals.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(300));
    }
}
