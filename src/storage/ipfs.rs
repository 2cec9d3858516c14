/// IPFS storage client via the Kubo HTTP API.
///
/// IPFS provides content-addressed storage where each piece of data gets
/// a unique CID based on its hash. Uploads are pinned so the local node
/// retains the content after the add.
use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::StorageClient;
use crate::error::{Error, Result};

/// Configuration for the IPFS HTTP API.
#[derive(Debug, Clone)]
pub struct IpfsConfig {
    /// IPFS API endpoint (e.g., "http://localhost:5001").
    pub api_url: String,
}

impl IpfsConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }
}

/// IPFS storage client.
///
/// Constructed through [`IpfsClient::connect`], which probes the API
/// endpoint so callers hold a handle that is known to be reachable.
pub struct IpfsClient {
    client: Client,
    config: IpfsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IpfsAddResponse {
    hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IpfsVersionResponse {
    version: String,
}

impl IpfsClient {
    /// Connect to the IPFS node, verifying the API endpoint responds.
    pub async fn connect(config: IpfsConfig) -> Result<Self> {
        let client = Client::new();

        let resp = client
            .post(format!("{}/api/v0/version", config.api_url))
            .send()
            .await
            .map_err(|e| Error::Storage(format!("IPFS node unreachable: {e}")))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Storage(format!("IPFS version probe failed: {body}")));
        }

        let version: IpfsVersionResponse = resp
            .json()
            .await
            .map_err(|e| Error::Storage(format!("IPFS version parse error: {e}")))?;

        debug!(version = %version.version, "Connected to IPFS node");

        Ok(Self { client, config })
    }
}

#[async_trait]
impl StorageClient for IpfsClient {
    fn name(&self) -> &str {
        "IPFS"
    }

    async fn upload(&self, data: &[u8]) -> Result<String> {
        let part = multipart::Part::bytes(data.to_vec()).file_name("data");
        let form = multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(format!("{}/api/v0/add", self.config.api_url))
            .query(&[("pin", "true"), ("cid-version", "1")])
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("IPFS add request failed: {e}")))?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Storage(format!("IPFS add failed: {body}")));
        }

        let add_resp: IpfsAddResponse = resp
            .json()
            .await
            .map_err(|e| Error::Storage(format!("IPFS response parse error: {e}")))?;

        Ok(add_resp.hash)
    }
}
