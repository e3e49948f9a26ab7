// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, header::CONTENT_TYPE};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use stress_types::{Block, SignedTransaction};
use url::Url;

mod error;
#[cfg(any(test, feature = "testing"))]
pub mod in_memory;
pub mod types;

pub use error::RestError;
#[cfg(any(test, feature = "testing"))]
pub use in_memory::InMemoryChain;
use types::{BlockJson, BlockListResponse, BlockRangeRequest, BroadcastHexRequest, BroadcastResponse};

pub type Result<T, E = RestError> = std::result::Result<T, E>;

const USER_AGENT: &str = concat!("stress-client-sdk-rust / ", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The operations the harness needs from a node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Submits a signed transaction. A node-side rejection is an error.
    async fn submit(&self, txn: &SignedTransaction) -> Result<()>;

    async fn get_head_block(&self) -> Result<Block>;

    /// Blocks with numbers in `[start, end)`, ascending. Missing blocks are
    /// simply absent from the result.
    async fn get_blocks_in_range(&self, start: u64, end: u64) -> Result<Vec<Block>>;

    /// Endpoint description for logs.
    fn endpoint(&self) -> String;
}

/// JSON/HTTP client for a node's wallet API.
#[derive(Clone, Debug)]
pub struct Client {
    inner: ReqwestClient,
    base_url: Url,
}

impl Client {
    pub fn new(base_url: Url) -> Result<Self> {
        let inner = ReqwestClient::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RestError::Http(base_url.to_string(), e))?;
        Ok(Self { inner, base_url })
    }

    pub fn from_str_url(base_url: &str) -> Result<Self> {
        Self::new(Url::parse(base_url)?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/{}", base_path, path));
        url
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.build_url(path);
        let response = self
            .inner
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| RestError::Http(url.to_string(), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RestError::Http(url.to_string(), e))?;
        serde_json::from_slice(&bytes).map_err(RestError::decode)
    }
}

#[async_trait]
impl ChainClient for Client {
    async fn submit(&self, txn: &SignedTransaction) -> Result<()> {
        let request = BroadcastHexRequest {
            transaction: hex::encode(txn.to_bytes()),
        };
        self.post::<_, BroadcastResponse>("wallet/broadcasthex", &request)
            .await?
            .into_result()
    }

    async fn get_head_block(&self) -> Result<Block> {
        self.post::<_, BlockJson>("wallet/getnowblock", &serde_json::json!({}))
            .await?
            .try_into()
    }

    async fn get_blocks_in_range(&self, start: u64, end: u64) -> Result<Vec<Block>> {
        let request = BlockRangeRequest {
            start_num: start,
            end_num: end,
        };
        self.post::<_, BlockListResponse>("wallet/getblockbylimitnext", &request)
            .await?
            .block
            .into_iter()
            .map(Block::try_from)
            .collect()
    }

    fn endpoint(&self) -> String {
        self.base_url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_keeps_base_path() {
        let client = Client::from_str_url("http://127.0.0.1:8090").unwrap();
        assert_eq!(
            client.build_url("wallet/getnowblock").as_str(),
            "http://127.0.0.1:8090/wallet/getnowblock"
        );

        let client = Client::from_str_url("http://stress-node.local/api/").unwrap();
        assert_eq!(
            client.build_url("wallet/broadcasthex").as_str(),
            "http://stress-node.local/api/wallet/broadcasthex"
        );
        assert!(Client::from_str_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_node_is_http_error() {
        // port 9 (discard) is not expected to serve HTTP
        let client = Client::from_str_url("http://127.0.0.1:9").unwrap();
        let error = client.get_head_block().await.unwrap_err();
        assert!(matches!(error, RestError::Http(_, _)), "{:?}", error);
    }
}
