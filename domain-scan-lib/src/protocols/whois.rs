//! WHOIS queries over raw TCP, optionally tunneled through SOCKS proxies.
//!
//! A query is the domain name followed by CRLF; the reply is everything the
//! server sends until it closes the connection. WHOIS replies are free text,
//! so only the "no entries found" marker is ever interpreted.

use crate::error::DomainScanError;
use crate::proxy::ProxyPool;
use crate::socks;
use crate::types::{parse_host_port, ProxyEndpoint, ProxyKind};
use crate::utils::extract_tld;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default socket timeout of a WHOIS exchange.
pub const DEFAULT_WHOIS_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of proxies tried before giving up on one query.
pub const DEFAULT_MAX_PROXY_ATTEMPTS: usize = 10;

const NO_ENTRIES_MARKER: &str = "no entries found";

/// Whether a WHOIS reply states that the domain is not registered.
pub fn reports_no_entries(reply: &str) -> bool {
    reply.to_lowercase().contains(NO_ENTRIES_MARKER)
}

/// WHOIS client with a per-TLD server table.
#[derive(Clone)]
pub struct WhoisClient {
    /// TLD -> (host, port)
    servers: HashMap<String, (String, u16)>,
    /// Applies to the proxy handshake and to the exchange separately
    timeout: Duration,
    /// Proxies to tunnel through; `None` connects directly
    proxies: Option<Arc<ProxyPool>>,
    max_proxy_attempts: usize,
}

impl WhoisClient {
    /// Create a client connecting directly to the given `host:port` servers.
    pub fn new(servers: &HashMap<String, String>) -> Result<Self, DomainScanError> {
        let servers = servers
            .iter()
            .map(|(tld, server)| Ok((tld.to_lowercase(), parse_host_port(server)?)))
            .collect::<Result<HashMap<_, _>, DomainScanError>>()?;

        Ok(Self {
            servers,
            timeout: DEFAULT_WHOIS_TIMEOUT,
            proxies: None,
            max_proxy_attempts: DEFAULT_MAX_PROXY_ATTEMPTS,
        })
    }

    /// Set the socket timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Tunnel every query through proxies drawn from `pool`, trying at most
    /// `max_attempts` of them per query.
    pub fn with_proxies(mut self, pool: Arc<ProxyPool>, max_attempts: usize) -> Self {
        self.proxies = Some(pool);
        self.max_proxy_attempts = max_attempts.max(1);
        self
    }

    /// Server configured for the domain's TLD.
    pub fn server_for(&self, domain: &str) -> Result<(&str, u16), DomainScanError> {
        let tld = extract_tld(domain)?;
        self.servers
            .get(tld)
            .map(|(host, port)| (host.as_str(), *port))
            .ok_or_else(|| DomainScanError::whois(domain, "Cannot find whois server"))
    }

    /// Send the query for `domain` and return the complete reply text.
    pub async fn query(&self, domain: &str) -> Result<String, DomainScanError> {
        let (host, port) = self.server_for(domain)?;
        let mut stream = self.open(host, port).await?;

        let exchange = async {
            stream.write_all(format!("{}\r\n", domain).as_bytes()).await?;
            let mut reply = Vec::new();
            stream.read_to_end(&mut reply).await?;
            Ok::<_, std::io::Error>(reply)
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(reply)) => Ok(String::from_utf8_lossy(&reply).into_owned()),
            Ok(Err(e)) => Err(DomainScanError::whois(domain, e.to_string())),
            Err(_) => Err(DomainScanError::timeout("WHOIS query", self.timeout)),
        }
    }

    async fn open(&self, host: &str, port: u16) -> Result<TcpStream, DomainScanError> {
        match &self.proxies {
            Some(pool) => self.open_via_proxy(pool, host, port).await,
            None => tokio::time::timeout(self.timeout, TcpStream::connect((host, port)))
                .await
                .map_err(|_| DomainScanError::timeout("WHOIS connect", self.timeout))?
                .map_err(DomainScanError::from),
        }
    }

    /// Try proxies until one tunnels through, retiring every one that fails.
    async fn open_via_proxy(
        &self,
        pool: &ProxyPool,
        host: &str,
        port: u16,
    ) -> Result<TcpStream, DomainScanError> {
        let mut attempts = 0;

        loop {
            if attempts >= self.max_proxy_attempts {
                return Err(DomainScanError::ProxyAttemptsExhausted { attempts });
            }

            let (kind, endpoint) = next_proxy(pool)
                .await?
                .ok_or(DomainScanError::NoProxyAvailable)?;
            attempts += 1;

            match socks::connect(kind, &endpoint, host, port, self.timeout).await {
                Ok(stream) => {
                    tracing::debug!(%kind, proxy = %endpoint, attempts, "Connected through proxy");
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!(%kind, proxy = %endpoint, error = %e, "Proxy failed");
                    pool.report_failed(kind, &endpoint).await;
                }
            }
        }
    }
}

/// SOCKS4 first, SOCKS5 once no SOCKS4 proxy is left.
async fn next_proxy(
    pool: &ProxyPool,
) -> Result<Option<(ProxyKind, ProxyEndpoint)>, DomainScanError> {
    for kind in ProxyKind::ALL {
        if let Some(endpoint) = pool.get(kind).await? {
            return Ok(Some((kind, endpoint)));
        }
    }
    Ok(None)
}
