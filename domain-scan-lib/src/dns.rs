//! Name server lookups for the DNS step of an availability check.
//!
//! The only question asked is whether a domain is delegated: NXDOMAIN or an
//! empty NS set means the name is free, any NS record means it is taken.
//! Individual TLDs can be routed to their own name servers.

use crate::error::DomainScanError;
use crate::utils::extract_tld;
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::proto::op::ResponseCode;
use trust_dns_resolver::TokioAsyncResolver;

/// Outcome of an NS lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NsAnswer {
    /// The resolver reported that the name does not exist
    NotFound,

    /// The name resolved but has no NS records
    Empty,

    /// The name is delegated to this many name servers
    Delegated(usize),
}

impl NsAnswer {
    /// Whether this answer means the domain can be registered.
    pub fn is_available(&self) -> bool {
        matches!(self, NsAnswer::NotFound | NsAnswer::Empty)
    }
}

/// Resolves the authoritative name servers of a domain.
#[async_trait]
pub trait NameServerLookup: Send + Sync {
    /// Resolver errors other than "does not exist" are returned as errors.
    async fn lookup_ns(&self, domain: &str) -> Result<NsAnswer, DomainScanError>;
}

/// DNS servers used in place of the system resolver for `ir` domains.
pub const IR_NAME_SERVERS: [&str; 5] = [
    "193.171.255.77",
    "193.189.123.2",
    "193.0.9.85",
    "193.189.122.83",
    "78.104.145.5",
];

/// `trust-dns` backed resolver with optional per-TLD name servers.
pub struct DnsResolver {
    default: TokioAsyncResolver,
    per_tld: HashMap<String, TokioAsyncResolver>,
}

impl DnsResolver {
    /// Build a resolver using the system configuration plus the given
    /// per-TLD server overrides.
    pub fn new(tld_servers: &HashMap<String, Vec<IpAddr>>) -> Self {
        let default = match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => resolver,
            Err(e) => {
                tracing::warn!(error = %e, "System resolver configuration unavailable, using defaults");
                TokioAsyncResolver::tokio(ResolverConfig::default(), resolver_opts())
            }
        };

        let per_tld = tld_servers
            .iter()
            .filter(|(_, servers)| !servers.is_empty())
            .map(|(tld, servers)| {
                let group = NameServerConfigGroup::from_ips_clear(servers, 53, true);
                let config = ResolverConfig::from_parts(None, vec![], group);
                (
                    tld.to_lowercase(),
                    TokioAsyncResolver::tokio(config, resolver_opts()),
                )
            })
            .collect();

        Self { default, per_tld }
    }

    /// TLDs routed to their own name servers.
    pub fn custom_tlds(&self) -> Vec<&str> {
        let mut tlds: Vec<&str> = self.per_tld.keys().map(String::as_str).collect();
        tlds.sort_unstable();
        tlds
    }

    fn resolver_for(&self, domain: &str) -> &TokioAsyncResolver {
        extract_tld(domain)
            .ok()
            .and_then(|tld| self.per_tld.get(tld))
            .unwrap_or(&self.default)
    }
}

fn resolver_opts() -> ResolverOpts {
    let mut opts = ResolverOpts::default();
    opts.timeout = Duration::from_secs(5);
    opts.attempts = 2;
    opts
}

#[async_trait]
impl NameServerLookup for DnsResolver {
    async fn lookup_ns(&self, domain: &str) -> Result<NsAnswer, DomainScanError> {
        let fqdn = format!("{}.", domain.trim_end_matches('.'));

        match self.resolver_for(domain).ns_lookup(fqdn.as_str()).await {
            Ok(lookup) => {
                let count = lookup.iter().count();
                Ok(if count == 0 {
                    NsAnswer::Empty
                } else {
                    NsAnswer::Delegated(count)
                })
            }
            Err(e) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { response_code, .. } => {
                    if *response_code == ResponseCode::NXDomain {
                        Ok(NsAnswer::NotFound)
                    } else {
                        Ok(NsAnswer::Empty)
                    }
                }
                _ => Err(DomainScanError::dns(domain, e.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_availability() {
        assert!(NsAnswer::NotFound.is_available());
        assert!(NsAnswer::Empty.is_available());
        assert!(!NsAnswer::Delegated(2).is_available());
    }

    #[tokio::test]
    async fn test_per_tld_servers_are_registered() {
        let mut servers = HashMap::new();
        servers.insert(
            "IR".to_string(),
            IR_NAME_SERVERS
                .iter()
                .map(|ip| ip.parse().unwrap())
                .collect::<Vec<IpAddr>>(),
        );
        servers.insert("com".to_string(), Vec::new());

        let resolver = DnsResolver::new(&servers);
        assert_eq!(resolver.custom_tlds(), vec!["ir"]);
        assert!(std::ptr::eq(
            resolver.resolver_for("ab.ir"),
            &resolver.per_tld["ir"]
        ));
        assert!(std::ptr::eq(
            resolver.resolver_for("ab.com"),
            &resolver.default
        ));
    }
}
