//! Built-in registry server tables.
//!
//! These are the defaults used when the configuration file does not provide
//! its own `[rdap.tlds]`, `[whois.tlds]` or `[dns.tlds]` tables.

use crate::dns::IR_NAME_SERVERS;
use std::collections::HashMap;

/// TLDs scanned when no `[scan] tlds` list is configured.
pub const DEFAULT_TLDS: [&str; 4] = ["ir", "com", "net", "org"];

/// Concurrency limit of a TLD queue unless overridden.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// TLD whose WHOIS server only tolerates one query at a time.
pub const SERIAL_TLD: &str = "ir";

/// Built-in RDAP base URLs (without the trailing `/domain/...` path).
pub fn default_rdap_servers() -> HashMap<String, String> {
    [
        ("com", "https://rdap.verisign.com/com/v1"),
        ("net", "https://rdap.verisign.com/net/v1"),
        ("org", "https://rdap.publicinterestregistry.org/rdap"),
    ]
    .into_iter()
    .map(|(tld, url)| (tld.to_string(), url.to_string()))
    .collect()
}

/// Built-in WHOIS servers in `host:port` form.
pub fn default_whois_servers() -> HashMap<String, String> {
    [
        ("ir", "whois.nic.ir:43"),
        ("com", "whois.verisign-grs.com:43"),
        ("net", "whois.verisign-grs.com:43"),
        ("org", "whois.pir.org:43"),
    ]
    .into_iter()
    .map(|(tld, server)| (tld.to_string(), server.to_string()))
    .collect()
}

/// Built-in per-TLD DNS servers.
pub fn default_dns_servers() -> HashMap<String, Vec<String>> {
    HashMap::from([(
        SERIAL_TLD.to_string(),
        IR_NAME_SERVERS.iter().map(|ip| ip.to_string()).collect(),
    )])
}

/// Built-in per-TLD concurrency limits.
pub fn default_concurrency_limits() -> HashMap<String, usize> {
    HashMap::from([(SERIAL_TLD.to_string(), 1)])
}

/// The default TLD list as owned strings.
pub fn default_tlds() -> Vec<String> {
    DEFAULT_TLDS.iter().map(|tld| tld.to_string()).collect()
}
