//! Pool of public SOCKS proxies used to tunnel WHOIS queries.
//!
//! One live list is kept per [`ProxyKind`]. A list is downloaded on first use
//! and again whenever it is empty or older than the configured TTL. Proxies
//! that fail are removed from the live list and remembered in a failed list;
//! a refresh replaces the live list without consulting the failed one.

use crate::error::DomainScanError;
use crate::types::{ProxyEndpoint, ProxyKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Default proxy list download URL; `{kind}` is replaced with `socks4`/`socks5`.
pub const DEFAULT_PROXY_SOURCE: &str = "https://www.proxy-list.download/api/v1/get?type={kind}";

/// Default lifetime of a downloaded list.
pub const DEFAULT_PROXY_TTL: Duration = Duration::from_secs(60 * 60);

/// Somewhere a flat `host:port` list of proxies can be fetched from.
#[async_trait]
pub trait ProxySource: Send + Sync {
    /// Fetch the raw list body for one proxy kind.
    async fn fetch(&self, kind: ProxyKind) -> Result<String, DomainScanError>;
}

/// Proxy list source backed by an HTTP endpoint.
pub struct HttpProxySource {
    client: reqwest::Client,
    url_template: String,
}

impl HttpProxySource {
    pub fn new<U: Into<String>>(url_template: U) -> Result<Self, DomainScanError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("domain-scan/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainScanError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url_template: url_template.into(),
        })
    }

    fn url_for(&self, kind: ProxyKind) -> String {
        self.url_template.replace("{kind}", kind.as_str())
    }
}

#[async_trait]
impl ProxySource for HttpProxySource {
    async fn fetch(&self, kind: ProxyKind) -> Result<String, DomainScanError> {
        let url = self.url_for(kind);
        tracing::debug!(%kind, %url, "Downloading proxy list");

        let response = self.client.get(&url).send().await.map_err(|e| {
            DomainScanError::proxy_list(kind.as_str(), format!("request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainScanError::proxy_list(
                kind.as_str(),
                format!("HTTP {}", status.as_u16()),
            ));
        }

        response.text().await.map_err(|e| {
            DomainScanError::proxy_list(kind.as_str(), format!("failed to read body: {}", e))
        })
    }
}

/// Parse a flat proxy list, one `host:port` per line. Malformed lines are skipped.
pub fn parse_proxy_list(body: &str) -> Vec<ProxyEndpoint> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match line.parse::<ProxyEndpoint>() {
            Ok(endpoint) => Some(endpoint),
            Err(_) => {
                tracing::debug!(line, "Skipping malformed proxy list entry");
                None
            }
        })
        .collect()
}

/// A proxy that was reported as failed, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedProxy {
    pub endpoint: ProxyEndpoint,
    pub failed_at: DateTime<Utc>,
}

#[derive(Default)]
struct PoolEntry {
    live: Vec<ProxyEndpoint>,
    failed: Vec<FailedProxy>,
    loaded_at: Option<Instant>,
}

impl PoolEntry {
    fn is_stale(&self, ttl: Duration) -> bool {
        match self.loaded_at {
            None => true,
            Some(loaded_at) => self.live.is_empty() || loaded_at.elapsed() > ttl,
        }
    }
}

/// Shared pool of SOCKS proxies, safe to use from many probes at once.
pub struct ProxyPool {
    source: Arc<dyn ProxySource>,
    ttl: Duration,
    entries: HashMap<ProxyKind, Mutex<PoolEntry>>,
}

impl ProxyPool {
    pub fn new(source: Arc<dyn ProxySource>, ttl: Duration) -> Self {
        let entries = ProxyKind::ALL
            .iter()
            .map(|kind| (*kind, Mutex::new(PoolEntry::default())))
            .collect();

        Self {
            source,
            ttl,
            entries,
        }
    }

    /// Pool downloading from an HTTP source with the given URL template.
    pub fn from_url(url_template: &str, ttl: Duration) -> Result<Self, DomainScanError> {
        Ok(Self::new(Arc::new(HttpProxySource::new(url_template)?), ttl))
    }

    /// Draw a random live proxy of the given kind.
    ///
    /// The list is refreshed first when it was never loaded, is empty or has
    /// outlived the TTL. A failed refresh is returned as an error. `Ok(None)`
    /// means the freshly loaded list is empty.
    pub async fn get(&self, kind: ProxyKind) -> Result<Option<ProxyEndpoint>, DomainScanError> {
        let mut entry = self.entry(kind).lock().await;

        if entry.is_stale(self.ttl) {
            let body = self.source.fetch(kind).await?;
            entry.live = parse_proxy_list(&body);
            entry.loaded_at = Some(Instant::now());
            tracing::info!(%kind, count = entry.live.len(), "Proxy list refreshed");
        }

        if entry.live.is_empty() {
            return Ok(None);
        }

        let index = rand::thread_rng().gen_range(0..entry.live.len());
        Ok(Some(entry.live[index].clone()))
    }

    /// Retire a proxy until the next refresh.
    ///
    /// Does nothing for a kind whose list was never loaded.
    pub async fn report_failed(&self, kind: ProxyKind, endpoint: &ProxyEndpoint) {
        let mut entry = self.entry(kind).lock().await;
        if entry.loaded_at.is_none() {
            return;
        }

        entry.failed.push(FailedProxy {
            endpoint: endpoint.clone(),
            failed_at: Utc::now(),
        });
        if let Some(position) = entry.live.iter().position(|live| live == endpoint) {
            entry.live.remove(position);
        }

        tracing::debug!(%kind, proxy = %endpoint, remaining = entry.live.len(), "Proxy marked as failed");
    }

    /// Number of live proxies currently cached for a kind.
    pub async fn live_count(&self, kind: ProxyKind) -> usize {
        self.entry(kind).lock().await.live.len()
    }

    /// Proxies reported as failed for a kind, oldest first.
    pub async fn failed(&self, kind: ProxyKind) -> Vec<FailedProxy> {
        self.entry(kind).lock().await.failed.clone()
    }

    fn entry(&self, kind: ProxyKind) -> &Mutex<PoolEntry> {
        // Every kind is inserted in the constructor
        &self.entries[&kind]
    }
}
