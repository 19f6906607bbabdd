//! Esplora REST block source backed by `reqwest`.
//!
//! Endpoints used (relative to the configured base URL):
//! - `GET /blocks/tip/height`          — tip height as plain text
//! - `GET /block-height/{height}`      — block hash as plain text
//! - `GET /internal/block/{hash}/txs`  — every transaction of a block as JSON
//! - `GET /address/{address}`          — funded/spent totals for an address

use std::time::Duration;

use async_trait::async_trait;
use num_bigint::BigInt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use balindex_core::error::IndexerError;
use balindex_core::source::BlockSource;
use balindex_core::types::Transaction;

/// Configuration for `EsploraClient`.
#[derive(Debug, Clone)]
pub struct EsploraClientConfig {
    /// Upper bound on a single HTTP request, connect to last byte.
    pub request_timeout: Duration,
}

impl Default for EsploraClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Confirmed-chain totals for one address, as reported by `/address/{addr}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStats {
    #[serde(default)]
    pub funded_txo_sum: u64,
    #[serde(default)]
    pub spent_txo_sum: u64,
    #[serde(default)]
    pub tx_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct AddressInfo {
    #[serde(default)]
    chain_stats: ChainStats,
}

impl ChainStats {
    /// Funded minus spent: the confirmed balance of the address.
    pub fn balance(&self) -> BigInt {
        BigInt::from(self.funded_txo_sum) - BigInt::from(self.spent_txo_sum)
    }
}

/// HTTP client for an electrs / Esplora REST endpoint.
#[derive(Clone)]
pub struct EsploraClient {
    base_url: String,
    http: reqwest::Client,
}

impl EsploraClient {
    /// Create a new client for the given base URL.
    pub fn new(url: impl Into<String>, config: EsploraClientConfig) -> Result<Self, IndexerError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| IndexerError::Config(format!("failed to build HTTP client: {e}")))?;

        let base_url = url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, http })
    }

    /// Create with default configuration.
    pub fn default_for(url: impl Into<String>) -> Result<Self, IndexerError> {
        Self::new(url, EsploraClientConfig::default())
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, IndexerError> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| IndexerError::Upstream(format!("GET {path}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(IndexerError::Upstream(format!(
                "GET {path}: HTTP {status}: {}",
                body.trim()
            )));
        }
        Ok(resp)
    }

    async fn get_text(&self, path: &str) -> Result<String, IndexerError> {
        self.get(path)
            .await?
            .text()
            .await
            .map_err(|e| IndexerError::Upstream(format!("GET {path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, IndexerError> {
        self.get(path)
            .await?
            .json::<T>()
            .await
            .map_err(|e| IndexerError::Upstream(format!("GET {path}: {e}")))
    }

    /// Confirmed balance of `address` according to the upstream index.
    pub async fn address_balance(&self, address: &str) -> Result<BigInt, IndexerError> {
        let info: AddressInfo = self.get_json(&format!("/address/{address}")).await?;
        Ok(info.chain_stats.balance())
    }
}

/// Parse a plain-text height response.
pub fn parse_height(body: &str) -> Result<u64, IndexerError> {
    body.trim()
        .parse::<u64>()
        .map_err(|e| IndexerError::Upstream(format!("invalid height '{}': {e}", body.trim())))
}

#[async_trait]
impl BlockSource for EsploraClient {
    async fn is_connected(&self) -> bool {
        match self.tip_height().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, url = %self.base_url, "connection probe failed");
                false
            }
        }
    }

    async fn tip_height(&self) -> Result<u64, IndexerError> {
        parse_height(&self.get_text("/blocks/tip/height").await?)
    }

    async fn block_hash(&self, height: u64) -> Result<String, IndexerError> {
        let hash = self.get_text(&format!("/block-height/{height}")).await?;
        let hash = hash.trim();
        if hash.is_empty() {
            return Err(IndexerError::Upstream(format!("empty hash for height {height}")));
        }
        Ok(hash.to_string())
    }

    async fn block_transactions(&self, hash: &str) -> Result<Vec<Transaction>, IndexerError> {
        self.get_json(&format!("/internal/block/{hash}/txs")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve canned `(path, status, body)` responses until the test ends.
    async fn serve(routes: Vec<(&'static str, u16, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let mut buf = vec![0u8; 4096];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let req = String::from_utf8_lossy(&buf[..n]).to_string();
                let path = req.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = routes
                    .iter()
                    .find(|(p, _, _)| *p == path)
                    .map(|(_, s, b)| (*s, *b))
                    .unwrap_or((404, "Block not found"));
                let resp = format!(
                    "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(resp.as_bytes()).await;
            }
        });
        format!("http://{addr}/")
    }

    #[test]
    fn parse_height_trims_whitespace() {
        assert_eq!(parse_height("840000\n").unwrap(), 840_000);
        assert!(parse_height("<html>").is_err());
    }

    #[test]
    fn chain_stats_balance() {
        let info: AddressInfo = serde_json::from_str(
            r#"{
                "address": "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh",
                "chain_stats": { "funded_txo_count": 3, "funded_txo_sum": 150000, "spent_txo_count": 1, "spent_txo_sum": 50000, "tx_count": 4 },
                "mempool_stats": { "funded_txo_count": 0, "funded_txo_sum": 0, "spent_txo_count": 0, "spent_txo_sum": 0, "tx_count": 0 }
            }"#,
        )
        .unwrap();
        assert_eq!(info.chain_stats.balance(), BigInt::from(100_000));
    }

    #[test]
    fn base_url_trailing_slash_removed() {
        let client = EsploraClient::default_for("http://localhost:3000/").unwrap();
        assert_eq!(client.url(), "http://localhost:3000");
    }

    #[tokio::test]
    async fn fetches_tip_hash_and_transactions() {
        let base = serve(vec![
            ("/blocks/tip/height", 200, "102"),
            ("/block-height/101", 200, "00000000000000000001"),
            (
                "/internal/block/00000000000000000001/txs",
                200,
                r#"[{"txid":"t1","vin":[{"txid":"00","vout":0,"prevout":null}],"vout":[{"scriptpubkey_address":"A","value":5000}],"status":{"block_height":101}}]"#,
            ),
        ])
        .await;
        let client = EsploraClient::default_for(base).unwrap();

        assert!(client.is_connected().await);
        assert_eq!(client.tip_height().await.unwrap(), 102);
        let hash = client.block_hash(101).await.unwrap();
        assert_eq!(hash, "00000000000000000001");
        let txs = client.block_transactions(&hash).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].vout[0].value, 5000);
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let base = serve(vec![("/blocks/tip/height", 503, "warming up")]).await;
        let client = EsploraClient::default_for(base).unwrap();

        assert!(!client.is_connected().await);
        let err = client.block_hash(999_999).await.unwrap_err();
        assert!(matches!(err, IndexerError::Upstream(_)));
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[tokio::test]
    async fn unreachable_host_is_not_connected() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = EsploraClient::default_for(format!("http://{addr}")).unwrap();
        assert!(!client.is_connected().await);
        assert!(matches!(client.tip_height().await, Err(IndexerError::Upstream(_))));
    }
}
