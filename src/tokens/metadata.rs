//! Token metadata resolution
//!
//! Metadata URIs are resolved lazily: the tile renders first, the image URL
//! is fetched when needed. ipfs:// URIs rewrite to the configured gateway.

use crate::error::{StakingError, StakingResult};

use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const IPFS_SCHEME: &str = "ipfs://";

/// The slice of ERC-721 metadata JSON this client cares about
#[derive(Debug, Clone, Deserialize)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub image: String,
}

/// Rewrite an ipfs:// URI to the HTTP gateway; anything else passes through
pub fn resolve_uri(uri: &str, gateway: &str) -> String {
    match uri.strip_prefix(IPFS_SCHEME) {
        Some(path) => format!("{}{}", gateway, path),
        None => uri.to_string(),
    }
}

/// HTTP client for metadata documents
pub struct MetadataClient {
    http: reqwest::Client,
    gateway: String,
}

impl MetadataClient {
    pub fn new(gateway: &str) -> StakingResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| StakingError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            gateway: gateway.to_string(),
        })
    }

    /// Fetch a token's metadata and return its display image URL
    pub async fn fetch_image_url(&self, metadata_uri: &str) -> StakingResult<String> {
        let url = resolve_uri(metadata_uri, &self.gateway);
        debug!("Fetching token metadata from {}", url);

        let metadata: TokenMetadata = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| StakingError::Metadata(format!("fetch {}: {}", url, e)))?
            .json()
            .await
            .map_err(|e| StakingError::Metadata(format!("parse {}: {}", url, e)))?;

        debug!("Fetched metadata for {:?}", metadata.name);
        Ok(resolve_uri(&metadata.image, &self.gateway))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GATEWAY: &str = "https://ipfs.io/ipfs/";

    #[test]
    fn ipfs_uris_rewrite_to_the_gateway() {
        assert_eq!(
            resolve_uri("ipfs://QmHash/7.json", GATEWAY),
            "https://ipfs.io/ipfs/QmHash/7.json"
        );
    }

    #[test]
    fn http_uris_pass_through() {
        assert_eq!(
            resolve_uri("https://example.com/7.json", GATEWAY),
            "https://example.com/7.json"
        );
    }

    #[test]
    fn metadata_json_deserializes() {
        let raw = r#"{
            "name": "Token #7",
            "description": "a token",
            "image": "ipfs://QmImage/7.png",
            "attributes": [{"trait_type": "hat", "value": "none"}]
        }"#;
        let metadata: TokenMetadata = serde_json::from_str(raw).unwrap();
        assert_eq!(metadata.image, "ipfs://QmImage/7.png");
        assert_eq!(metadata.name.as_deref(), Some("Token #7"));
    }
}
