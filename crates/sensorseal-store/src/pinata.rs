//! Pinata-compatible HTTP store.

use async_trait::async_trait;
use reqwest::StatusCode;
use sensorseal_canonical::ContentIdentifier;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::StoreError;
use crate::traits::ContentStore;

/// Default JSON pinning endpoint.
pub const DEFAULT_PIN_URL: &str = "https://api.pinata.cloud/pinning/pinJSONToIPFS";
/// Default public gateway prefix.
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.pinata.cloud/ipfs/";

/// Connection settings for a Pinata-style store.
#[derive(Debug, Clone)]
pub struct PinataConfig {
    /// Pin endpoint receiving the JSON upload.
    pub pin_url: Url,
    /// Gateway prefix; the identifier is appended to fetch content.
    pub gateway_url: Url,
    /// Bearer token (JWT).
    pub jwt: String,
}

/// Store client that pins JSON documents over HTTP.
#[derive(Debug, Clone)]
pub struct PinataStore {
    client: reqwest::Client,
    config: PinataConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PinRequest<'a> {
    pinata_options: PinOptions,
    pinata_metadata: PinMetadata<'a>,
    pinata_content: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PinOptions {
    cid_version: u8,
}

#[derive(Serialize)]
struct PinMetadata<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: Option<String>,
}

impl PinataStore {
    /// Creates a store client with a fresh connection pool.
    pub fn new(config: PinataConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn gateway_url_for(&self, id: &ContentIdentifier) -> Result<Url, StoreError> {
        let mut base = self.config.gateway_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(id.as_str())
            .map_err(|e| StoreError::InvalidResponse(format!("bad identifier '{id}': {e}")))
    }
}

async fn failure(status: StatusCode, response: reqwest::Response) -> StoreError {
    let body = response.text().await.unwrap_or_default();
    StoreError::Unavailable {
        status: Some(status.as_u16()),
        reason: format!("{status} {body}"),
    }
}

#[async_trait]
impl ContentStore for PinataStore {
    async fn pin(&self, bytes: Vec<u8>, name: &str) -> Result<ContentIdentifier, StoreError> {
        let content: Value = serde_json::from_slice(&bytes)?;
        let request = PinRequest {
            pinata_options: PinOptions { cid_version: 1 },
            pinata_metadata: PinMetadata { name },
            pinata_content: content,
        };

        debug!(name, size = bytes.len(), "pinning content");

        let response = self
            .client
            .post(self.config.pin_url.clone())
            .bearer_auth(&self.config.jwt)
            .json(&request)
            .send()
            .await
            .map_err(StoreError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(failure(status, response).await);
        }

        let parsed: PinResponse = response.json().await.map_err(StoreError::transport)?;
        let hash = parsed
            .ipfs_hash
            .ok_or_else(|| StoreError::InvalidResponse("missing IpfsHash".to_owned()))?;
        ContentIdentifier::parse(hash).map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    async fn fetch(&self, id: &ContentIdentifier) -> Result<Vec<u8>, StoreError> {
        let url = self.gateway_url_for(id)?;
        debug!(%url, "fetching content");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(StoreError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(failure(status, response).await);
        }

        let bytes = response.bytes().await.map_err(StoreError::transport)?;
        Ok(bytes.to_vec())
    }
}
