//! In-memory fakes for the remote capabilities, shared by pipeline tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::compose::StackController;
use crate::datastore::{is_reserved, Datastore};
use crate::spark::SparkServices;
use crate::{Error, Result};

/// Fake document store. Assigns `_rev` stamps on insert and rejects
/// documents that already carry one, like the real store does.
#[derive(Default)]
pub struct FakeDatastore {
    pub dbs: Mutex<BTreeMap<String, Vec<Value>>>,
    pub unavailable: bool,
    /// Database whose document fetch fails with a 500.
    pub fail_fetch: Option<String>,
    /// Database whose bulk insert fails with a 500.
    pub fail_insert: Option<String>,
}

impl FakeDatastore {
    pub fn with_db(self, name: &str, docs: Vec<Value>) -> Self {
        self.dbs.lock().unwrap().insert(name.to_string(), docs);
        self
    }

    /// Documents of one database with revision stamps removed.
    pub fn stripped_docs(&self, db: &str) -> Option<Vec<Value>> {
        self.dbs.lock().unwrap().get(db).map(|docs| {
            docs.iter()
                .cloned()
                .map(crate::datastore::strip_revision)
                .collect()
        })
    }
}

#[async_trait]
impl Datastore for FakeDatastore {
    async fn wait_ready(&self) -> Result<()> {
        if self.unavailable {
            Err(Error::RemoteUnavailable {
                url: "fake://datastore".to_string(),
            })
        } else {
            Ok(())
        }
    }

    async fn all_dbs(&self) -> Result<Vec<String>> {
        Ok(self
            .dbs
            .lock()
            .unwrap()
            .keys()
            .filter(|db| !is_reserved(db))
            .cloned()
            .collect())
    }

    async fn all_docs(&self, db: &str) -> Result<Vec<Value>> {
        if self.fail_fetch.as_deref() == Some(db) {
            return Err(Error::RemoteRequest {
                status: 500,
                url: format!("fake://datastore/{}/_all_docs", db),
            });
        }
        self.dbs
            .lock()
            .unwrap()
            .get(db)
            .cloned()
            .ok_or_else(|| Error::RemoteRequest {
                status: 404,
                url: format!("fake://datastore/{}/_all_docs", db),
            })
    }

    async fn delete_db(&self, db: &str) -> Result<()> {
        self.dbs.lock().unwrap().remove(db);
        Ok(())
    }

    async fn create_db(&self, db: &str) -> Result<()> {
        let mut dbs = self.dbs.lock().unwrap();
        if dbs.contains_key(db) {
            return Err(Error::RemoteRequest {
                status: 412,
                url: format!("fake://datastore/{}", db),
            });
        }
        dbs.insert(db.to_string(), Vec::new());
        Ok(())
    }

    async fn insert_docs(&self, db: &str, docs: &[Value]) -> Result<()> {
        if self.fail_insert.as_deref() == Some(db) {
            return Err(Error::RemoteRequest {
                status: 500,
                url: format!("fake://datastore/{}/_bulk_docs", db),
            });
        }
        if docs.iter().any(|doc| doc.get("_rev").is_some()) {
            // Stale revision stamp, the store reports a conflict.
            return Err(Error::RemoteRequest {
                status: 409,
                url: format!("fake://datastore/{}/_bulk_docs", db),
            });
        }
        let mut dbs = self.dbs.lock().unwrap();
        let stored = dbs.entry(db.to_string()).or_default();
        for doc in docs {
            let mut doc = doc.clone();
            if let Some(obj) = doc.as_object_mut() {
                obj.insert("_rev".to_string(), Value::from("1-fake"));
            }
            stored.push(doc);
        }
        Ok(())
    }
}

/// Fake Spark services with canned exports. Payloads are opaque bytes, like
/// the real wire exchange.
#[derive(Default)]
pub struct FakeSparks {
    pub exports: Mutex<BTreeMap<String, Vec<u8>>>,
    pub imported: Mutex<Vec<(String, Vec<u8>)>>,
}

impl FakeSparks {
    pub fn with_service(self, name: &str, payload: &[u8]) -> Self {
        self.exports
            .lock()
            .unwrap()
            .insert(name.to_string(), payload.to_vec());
        self
    }
}

#[async_trait]
impl SparkServices for FakeSparks {
    async fn export_blocks(&self, service: &str) -> Result<Vec<u8>> {
        self.exports
            .lock()
            .unwrap()
            .get(service)
            .cloned()
            .ok_or_else(|| Error::RemoteRequest {
                status: 404,
                url: format!("fake://host/{}/export_objects", service),
            })
    }

    async fn import_blocks(&self, service: &str, payload: &[u8]) -> Result<()> {
        if !self.exports.lock().unwrap().contains_key(service) {
            return Err(Error::RemoteRequest {
                status: 404,
                url: format!("fake://host/{}/import_objects", service),
            });
        }
        self.imported
            .lock()
            .unwrap()
            .push((service.to_string(), payload.to_vec()));
        Ok(())
    }
}

/// Records topology reconciliations instead of running docker-compose.
#[derive(Default)]
pub struct FakeController {
    pub ups: AtomicUsize,
}

impl StackController for FakeController {
    fn up(&self) -> Result<()> {
        self.ups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn ps(&self) -> Result<String> {
        Ok(String::new())
    }
}
