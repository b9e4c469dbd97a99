//! Device-service capability of the remote state client.
//!
//! Each Spark service owns a graph of configuration blocks with its own
//! schema. Exports are treated as opaque JSON and passed through unmodified;
//! import is additive, so blocks on the live service that the payload does
//! not mention are left alone.

use async_trait::async_trait;
use tracing::info;

use crate::config::CtlConfig;
use crate::{Error, Result};

#[async_trait]
pub trait SparkServices: Send + Sync {
    /// Export the full block graph of one service. The payload is opaque to
    /// the caller and must survive a round trip byte for byte.
    async fn export_blocks(&self, service: &str) -> Result<Vec<u8>>;

    /// Import a previously exported block graph into one service.
    async fn import_blocks(&self, service: &str, payload: &[u8]) -> Result<()>;
}

/// HTTP implementation talking to Spark services through the stack gateway.
pub struct HttpSparkClient {
    client: reqwest::Client,
    host_url: String,
}

impl HttpSparkClient {
    pub fn new(config: &CtlConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            client,
            host_url: config.host_url.clone(),
        })
    }

    fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
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
}

#[async_trait]
impl SparkServices for HttpSparkClient {
    async fn export_blocks(&self, service: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}/export_objects", self.host_url, service);
        info!("Exporting blocks from '{}'", service);
        let resp = Self::check(self.client.get(&url).send().await?)?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn import_blocks(&self, service: &str, payload: &[u8]) -> Result<()> {
        let url = format!("{}/{}/import_objects", self.host_url, service);
        info!("Importing blocks into '{}'", service);
        Self::check(
            self.client
                .post(&url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload.to_vec())
                .send()
                .await?,
        )?;
        Ok(())
    }
}
