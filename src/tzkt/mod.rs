/// TzKT Client Module
///
/// This module handles all interactions with the TzKT indexer API. It wraps a
/// reqwest client and exposes the two page shapes the indexing loop needs:
/// the most recent delegations (bootstrap) and delegations above a level
/// (incremental).
pub mod types;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::{IndexerError, IndexerResult};
pub use types::{Account, TzktDelegation};

pub const DEFAULT_TZKT_URL: &str = "https://api.tzkt.io/v1/";

/// Source of raw delegation operations
#[async_trait]
pub trait DelegationSource: Send + Sync {
    /// Most recent `limit` delegations, newest first
    async fn fetch_recent(&self, limit: usize) -> IndexerResult<Vec<TzktDelegation>>;

    /// Delegations with level strictly greater than `after_level`, ascending, at most `limit`
    async fn fetch_from_level(&self, after_level: i64, limit: usize) -> IndexerResult<Vec<TzktDelegation>>;
}

pub struct TzktClient {
    client: Client,
    base_url: String,
}

impl TzktClient {
    /// Create a new client for the given API root (e.g. `https://api.tzkt.io/v1/`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let client = Client::builder()
            .user_agent(concat!("tezos-delegation-indexer/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build TzKT HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// Get the API root this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Test the API connection by asking for the current head
    pub async fn test_connection(&self) -> Result<()> {
        let url = format!("{}head", self.base_url);
        let response = self.client.get(&url).send().await.with_context(|| format!("Failed GET request: {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("GET {} returned {}", url, response.status());
        }

        Ok(())
    }

    async fn get_delegations(&self, query: &[(&str, String)]) -> IndexerResult<Vec<TzktDelegation>> {
        let url = format!("{}operations/delegations", self.base_url);
        tracing::debug!(%url, ?query, "Fetching delegations");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| IndexerError::Fetch(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(180).collect();
            return Err(IndexerError::Fetch(format!("GET {url} returned {status}: {preview}")));
        }

        let delegations = response
            .json::<Vec<TzktDelegation>>()
            .await
            .map_err(|e| IndexerError::Fetch(format!("invalid delegations payload from {url}: {e}")))?;

        tracing::debug!(count = delegations.len(), "Fetched delegations");
        Ok(delegations)
    }
}

#[async_trait]
impl DelegationSource for TzktClient {
    async fn fetch_recent(&self, limit: usize) -> IndexerResult<Vec<TzktDelegation>> {
        self.get_delegations(&[("limit", limit.to_string()), ("sort.desc", "level".to_string())]).await
    }

    async fn fetch_from_level(&self, after_level: i64, limit: usize) -> IndexerResult<Vec<TzktDelegation>> {
        if after_level <= 0 {
            return self.fetch_recent(limit).await;
        }

        self.get_delegations(&[
            ("level.gt", after_level.to_string()),
            ("limit", limit.to_string()),
            ("sort.asc", "level".to_string()),
        ])
        .await
    }
}
