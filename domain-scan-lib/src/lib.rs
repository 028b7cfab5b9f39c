//! # Domain Scan Library
//!
//! Pattern-driven domain availability scanning.
//!
//! A scan pattern (wildcards or a raw regular expression) is expanded into
//! candidate names. Every candidate is checked on a bounded work queue of its
//! TLD by walking a protocol chain: RDAP where the registry offers it, then
//! DNS, then WHOIS (optionally tunneled through public SOCKS proxies) to
//! confirm names DNS reports as taken.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_scan_lib::{
//!     AvailabilityProbe, JsonStateStore, NullNotifier, ScanConfig, ScanLimits, Scanner,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScanConfig::load(None, false)?;
//!     let probe = AvailabilityProbe::from_config(&config, None)?;
//!     let scanner = Scanner::new(
//!         Arc::new(probe),
//!         Arc::new(JsonStateStore::open(&config.database_path)),
//!         Arc::new(NullNotifier),
//!         ScanLimits::from_config(&config),
//!     );
//!
//!     scanner.launch("ab%d.ir", false).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Pattern syntax
//!
//! - `*` any one of `a-z`, `0-9` or `-`
//! - `%d` one digit, `%w` one letter, `%s` a hyphen
//! - with the regex flag set the pattern is used as a regular expression

pub use checker::{AvailabilityProbe, DomainProbe};
pub use config::{
    load_env_config, parse_duration_string, ConfigManager, EnvConfig, FileConfig, LoggingConfig,
    ScanConfig, ServerConfig,
};
pub use dns::{DnsResolver, NameServerLookup, NsAnswer};
pub use error::DomainScanError;
pub use generate::{convert_pattern_to_regex, validate_pattern, Expansion, MAX_EXPANSIONS};
pub use notify::{BroadcastNotifier, NullNotifier, ScanNotifier};
pub use protocols::{RdapClient, WhoisClient};
pub use proxy::{parse_proxy_list, FailedProxy, HttpProxySource, ProxyPool, ProxySource};
pub use queue::{Completion, QueueEvent, Work, WorkQueue};
pub use report::export_csv;
pub use scanner::{DomainCheck, ScanLimits, Scanner};
pub use store::{JsonStateStore, MemoryStateStore, StateStore};
pub use types::{
    CheckEvent, CheckMethod, CheckRecord, CheckStatus, ProbeResult, ProxyEndpoint, ProxyKind,
    ScanEvent, ScanState,
};
pub use utils::{is_valid_domain, validate_domain};

// Public modules
pub mod generate;
pub mod protocols;
pub mod queue;
pub mod socks;

// Internal modules - reachable through the re-exports above
mod checker;
mod config;
mod dns;
mod error;
mod notify;
mod proxy;
mod report;
mod scanner;
mod store;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DomainScanError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
