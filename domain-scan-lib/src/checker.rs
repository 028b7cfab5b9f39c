//! Per-domain availability probe.
//!
//! [`AvailabilityProbe`] walks a fixed protocol chain for one domain:
//!
//! 1. RDAP, when the TLD has an endpoint. Its answer is final.
//! 2. DNS: NXDOMAIN or an empty NS set means available, and that is final.
//! 3. WHOIS, only when DNS found name servers. For `ir` domains a
//!    "no entries found" reply overrides DNS and the domain is available.
//!    Any WHOIS failure is logged and the DNS answer stands.

use crate::config::ScanConfig;
use crate::dns::{DnsResolver, NameServerLookup};
use crate::error::DomainScanError;
use crate::protocols::registry::SERIAL_TLD;
use crate::protocols::{reports_no_entries, RdapClient, WhoisClient};
use crate::proxy::ProxyPool;
use crate::types::{CheckMethod, ProbeResult};
use crate::utils::{extract_tld, validate_domain};
use async_trait::async_trait;
use std::sync::Arc;

/// Anything that can decide whether a single domain is available.
#[async_trait]
pub trait DomainProbe: Send + Sync {
    async fn probe(&self, domain: &str) -> Result<ProbeResult, DomainScanError>;
}

/// The RDAP → DNS → WHOIS probe chain.
pub struct AvailabilityProbe {
    rdap: RdapClient,
    dns: Arc<dyn NameServerLookup>,
    whois: WhoisClient,
}

impl AvailabilityProbe {
    pub fn new(rdap: RdapClient, dns: Arc<dyn NameServerLookup>, whois: WhoisClient) -> Self {
        Self { rdap, dns, whois }
    }

    /// Build the full chain from configuration.
    ///
    /// When proxying is enabled, WHOIS queries are tunneled through `proxies`.
    pub fn from_config(
        config: &ScanConfig,
        proxies: Option<Arc<ProxyPool>>,
    ) -> Result<Self, DomainScanError> {
        let rdap = RdapClient::new(config.rdap_servers.clone())?;
        let resolver = DnsResolver::new(&config.dns_servers);
        tracing::debug!(tlds = ?resolver.custom_tlds(), "TLDs with dedicated name servers");
        let dns: Arc<dyn NameServerLookup> = Arc::new(resolver);

        let mut whois = WhoisClient::new(&config.whois_servers)?.with_timeout(config.whois_timeout);
        if config.use_proxy {
            let pool = match proxies {
                Some(pool) => pool,
                None => Arc::new(ProxyPool::from_url(
                    &config.proxy_source_url,
                    config.proxy_ttl,
                )?),
            };
            whois = whois.with_proxies(pool, config.max_proxy_attempts);
        }

        Ok(Self::new(rdap, dns, whois))
    }

    /// WHOIS confirmation of a DNS "taken" answer.
    async fn confirm_with_whois(&self, domain: &str, tld: &str) -> ProbeResult {
        let taken = ProbeResult::new(false, CheckMethod::Dns);

        match self.whois.query(domain).await {
            Ok(reply) => {
                if tld == SERIAL_TLD && reports_no_entries(&reply) {
                    tracing::debug!(domain, "WHOIS reports no entries, overriding DNS");
                    ProbeResult::new(true, CheckMethod::Whois)
                } else {
                    taken
                }
            }
            Err(e) => {
                tracing::warn!(domain, error = %e, "WHOIS query failed, keeping DNS answer");
                taken
            }
        }
    }
}

#[async_trait]
impl DomainProbe for AvailabilityProbe {
    async fn probe(&self, domain: &str) -> Result<ProbeResult, DomainScanError> {
        validate_domain(domain)?;
        let tld = extract_tld(domain)?;

        if self.rdap.endpoint_for(domain).is_some() {
            let available = self.rdap.check_domain(domain).await?;
            return Ok(ProbeResult::new(available, CheckMethod::Rdap));
        }

        let answer = self.dns.lookup_ns(domain).await?;
        tracing::trace!(domain, ?answer, "NS lookup finished");
        if answer.is_available() {
            return Ok(ProbeResult::new(true, CheckMethod::Dns));
        }

        Ok(self.confirm_with_whois(domain, tld).await)
    }
}
