//! Protocol clients used by the availability probe.
//!
//! RDAP answers first when the TLD has an endpoint; WHOIS is used to confirm
//! what DNS reports. The registry module holds the built-in server tables.

/// RDAP (Registration Data Access Protocol) client
pub mod rdap;

/// WHOIS over TCP, optionally through SOCKS proxies
pub mod whois;

/// Built-in server tables
pub mod registry;

pub use rdap::RdapClient;
pub use registry::{
    default_concurrency_limits, default_dns_servers, default_rdap_servers, default_tlds,
    default_whois_servers,
};
pub use whois::{reports_no_entries, WhoisClient};
