//! Configuration file parsing and management.
//!
//! Configuration comes from a TOML file (explicit path or discovered in the
//! usual locations) and a handful of `DS_*` environment variables. Every
//! section of the file is optional; [`ScanConfig`] is the fully resolved
//! result with built-in defaults filled in.

use crate::error::DomainScanError;
use crate::protocols::registry::{
    default_concurrency_limits, default_dns_servers, default_rdap_servers, default_tlds,
    default_whois_servers, DEFAULT_CONCURRENCY,
};
use crate::protocols::whois::{DEFAULT_MAX_PROXY_ATTEMPTS, DEFAULT_WHOIS_TIMEOUT};
use crate::proxy::{DEFAULT_PROXY_SOURCE, DEFAULT_PROXY_TTL};
use crate::types::parse_host_port;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the state database.
pub const DEFAULT_DATABASE_PATH: &str = "scan-state.json";

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Front-end listener settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseSection>,

    /// RDAP base URL per TLD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rdap: Option<RdapSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois: Option<WhoisSection>,

    /// Alternate DNS servers per TLD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxySection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingSection {
    /// `EnvFilter` directive, e.g. "info" or "domain_scan_lib=debug"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Log to stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console: Option<bool>,

    /// Also log to this file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RdapSection {
    /// Replaces the built-in table when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tlds: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WhoisSection {
    /// Tunnel WHOIS queries through public SOCKS proxies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_proxy: Option<bool>,

    /// Socket timeout, e.g. "5s"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_proxy_attempts: Option<usize>,

    /// `host:port` per TLD; replaces the built-in table when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tlds: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DnsSection {
    /// Replaces the built-in table when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tlds: Option<HashMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProxySection {
    /// Proxy list URL containing a `{kind}` placeholder
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    /// How long a downloaded list is trusted, e.g. "1h"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanSection {
    /// Supported TLDs; candidates outside this list are skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tlds: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_concurrency: Option<usize>,

    /// Per-TLD limits, merged over the built-in ones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<HashMap<String, usize>>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Log which file was picked
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, DomainScanError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DomainScanError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DomainScanError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        Ok(config)
    }

    /// Load the explicit file if given, otherwise the first discovered one.
    ///
    /// Returns the default (empty) configuration when nothing is found.
    pub fn discover_and_load(&self, explicit: Option<&Path>) -> Result<FileConfig, DomainScanError> {
        if let Some(path) = explicit {
            return self.load_file(path);
        }

        let discovered = self
            .get_local_config_path()
            .or_else(|| self.get_global_config_path())
            .or_else(|| self.get_xdg_config_path());

        match discovered {
            Some(path) => {
                if self.verbose {
                    tracing::info!(path = %path.display(), "Using configuration file");
                }
                self.load_file(&path)
            }
            None => Ok(FileConfig::default()),
        }
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./domain-scan.toml", "./.domain-scan.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".domain-scan.toml", "domain-scan.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// `$XDG_CONFIG_HOME/domain-scan/config.toml`, falling back to `~/.config`.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-scan").join("config.toml");
        path.exists().then_some(path)
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), DomainScanError> {
        if let Some(scan) = &config.scan {
            if let Some(limit) = scan.default_concurrency {
                validate_concurrency("default_concurrency", limit)?;
            }
            for (tld, limit) in scan.concurrency.iter().flatten() {
                validate_concurrency(&format!("concurrency for '{}'", tld), *limit)?;
            }
            if let Some(tlds) = &scan.tlds {
                if tlds.is_empty() {
                    return Err(DomainScanError::config("scan.tlds cannot be empty"));
                }
                for tld in tlds {
                    if tld.is_empty() || tld.contains('.') || tld.contains(' ') {
                        return Err(DomainScanError::config(format!(
                            "Invalid TLD '{}' in scan.tlds",
                            tld
                        )));
                    }
                }
            }
        }

        if let Some(rdap) = &config.rdap {
            for (tld, url) in rdap.tlds.iter().flatten() {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(DomainScanError::config(format!(
                        "RDAP endpoint for '{}' must be an http(s) URL, got '{}'",
                        tld, url
                    )));
                }
            }
        }

        if let Some(whois) = &config.whois {
            for (tld, server) in whois.tlds.iter().flatten() {
                parse_host_port(server).map_err(|_| {
                    DomainScanError::config(format!(
                        "WHOIS server for '{}' must be host:port, got '{}'",
                        tld, server
                    ))
                })?;
            }
            if let Some(timeout) = &whois.timeout {
                require_duration("whois.timeout", timeout)?;
            }
            if whois.max_proxy_attempts == Some(0) {
                return Err(DomainScanError::config(
                    "whois.max_proxy_attempts must be at least 1",
                ));
            }
        }

        if let Some(dns) = &config.dns {
            for (tld, servers) in dns.tlds.iter().flatten() {
                for server in servers {
                    server.parse::<IpAddr>().map_err(|_| {
                        DomainScanError::config(format!(
                            "DNS server '{}' for '{}' is not an IP address",
                            server, tld
                        ))
                    })?;
                }
            }
        }

        if let Some(proxy) = &config.proxy {
            if let Some(url) = &proxy.source_url {
                if !url.contains("{kind}") {
                    return Err(DomainScanError::config(format!(
                        "proxy.source_url must contain a {{kind}} placeholder, got '{}'",
                        url
                    )));
                }
            }
            if let Some(ttl) = &proxy.ttl {
                require_duration("proxy.ttl", ttl)?;
            }
        }

        Ok(())
    }
}

fn validate_concurrency(what: &str, limit: usize) -> Result<(), DomainScanError> {
    if limit == 0 || limit > 100 {
        return Err(DomainScanError::config(format!(
            "{} must be between 1 and 100, got {}",
            what, limit
        )));
    }
    Ok(())
}

fn require_duration(what: &str, value: &str) -> Result<Duration, DomainScanError> {
    parse_duration_string(value).ok_or_else(|| {
        DomainScanError::config(format!(
            "Invalid duration '{}' for {}. Use a format like '5s', '2m' or '1h'",
            value, what
        ))
    })
}

/// Environment variable overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub database: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub use_proxy: Option<bool>,
}

/// Load configuration from `DS_*` environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config(verbose: bool) -> EnvConfig {
    env_config_from(|key| env::var(key).ok(), verbose)
}

fn env_config_from<F>(lookup: F, verbose: bool) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(path) = non_empty("DS_DATABASE") {
        env_config.database = Some(PathBuf::from(path.trim()));
    }

    if let Some(level) = non_empty("DS_LOG_LEVEL") {
        env_config.log_level = Some(level.trim().to_string());
    }

    if let Some(path) = non_empty("DS_LOG_FILE") {
        env_config.log_file = Some(PathBuf::from(path.trim()));
    }

    if let Some(value) = non_empty("DS_USE_PROXY") {
        match parse_bool(&value) {
            Some(flag) => env_config.use_proxy = Some(flag),
            None => tracing::warn!(value = %value, "Invalid DS_USE_PROXY, expected true or false"),
        }
    }

    if verbose && env_config != EnvConfig::default() {
        tracing::info!(?env_config, "Applying environment overrides");
    }

    env_config
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a duration string like "5s", "2m", "1h" or bare seconds.
pub fn parse_duration_string(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    let seconds = if let Some(hours) = value.strip_suffix('h') {
        hours.parse::<u64>().ok()?.checked_mul(3600)?
    } else if let Some(minutes) = value.strip_suffix('m') {
        minutes.parse::<u64>().ok()?.checked_mul(60)?
    } else if let Some(seconds) = value.strip_suffix('s') {
        seconds.parse::<u64>().ok()?
    } else {
        value.parse::<u64>().ok()?
    };

    Some(Duration::from_secs(seconds))
}

/// Front-end listener settings. Not used by the scanner itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub console: bool,
    pub file: Option<PathBuf>,
}

/// Fully resolved configuration with defaults applied.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub database_path: PathBuf,
    pub rdap_servers: HashMap<String, String>,
    pub whois_servers: HashMap<String, String>,
    pub whois_timeout: Duration,
    pub use_proxy: bool,
    pub max_proxy_attempts: usize,
    pub dns_servers: HashMap<String, Vec<IpAddr>>,
    pub proxy_source_url: String,
    pub proxy_ttl: Duration,
    pub tlds: Vec<String>,
    pub default_concurrency: usize,
    pub concurrency: HashMap<String, usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let dns_servers = default_dns_servers()
            .into_iter()
            .map(|(tld, servers)| {
                let ips = servers.iter().filter_map(|ip| ip.parse().ok()).collect();
                (tld, ips)
            })
            .collect();

        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                console: true,
                file: None,
            },
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            rdap_servers: default_rdap_servers(),
            whois_servers: default_whois_servers(),
            whois_timeout: DEFAULT_WHOIS_TIMEOUT,
            use_proxy: true,
            max_proxy_attempts: DEFAULT_MAX_PROXY_ATTEMPTS,
            dns_servers,
            proxy_source_url: DEFAULT_PROXY_SOURCE.to_string(),
            proxy_ttl: DEFAULT_PROXY_TTL,
            tlds: default_tlds(),
            default_concurrency: DEFAULT_CONCURRENCY,
            concurrency: default_concurrency_limits(),
        }
    }
}

impl ScanConfig {
    /// Discover, load and resolve configuration, then apply environment
    /// overrides.
    pub fn load(explicit: Option<&Path>, verbose: bool) -> Result<Self, DomainScanError> {
        let file = ConfigManager::new(verbose).discover_and_load(explicit)?;
        let mut config = Self::from_file_config(file)?;
        config.apply_env(&load_env_config(verbose));
        Ok(config)
    }

    /// Resolve a file configuration over the built-in defaults.
    pub fn from_file_config(file: FileConfig) -> Result<Self, DomainScanError> {
        let mut config = Self::default();

        if let Some(server) = file.server {
            if let Some(host) = server.host {
                config.server.host = host;
            }
            if let Some(port) = server.port {
                config.server.port = port;
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                config.logging.level = level;
            }
            if let Some(console) = logging.console {
                config.logging.console = console;
            }
            config.logging.file = logging.file;
        }

        if let Some(path) = file.database.and_then(|db| db.path) {
            config.database_path = path;
        }

        if let Some(tlds) = file.rdap.and_then(|rdap| rdap.tlds) {
            config.rdap_servers = lowercase_keys(tlds);
        }

        if let Some(whois) = file.whois {
            if let Some(use_proxy) = whois.use_proxy {
                config.use_proxy = use_proxy;
            }
            if let Some(timeout) = whois.timeout {
                config.whois_timeout = require_duration("whois.timeout", &timeout)?;
            }
            if let Some(attempts) = whois.max_proxy_attempts {
                config.max_proxy_attempts = attempts;
            }
            if let Some(tlds) = whois.tlds {
                config.whois_servers = lowercase_keys(tlds);
            }
        }

        if let Some(tlds) = file.dns.and_then(|dns| dns.tlds) {
            config.dns_servers = tlds
                .into_iter()
                .map(|(tld, servers)| {
                    let ips = servers
                        .iter()
                        .map(|server| {
                            server.parse::<IpAddr>().map_err(|_| {
                                DomainScanError::config(format!(
                                    "DNS server '{}' is not an IP address",
                                    server
                                ))
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok((tld.to_lowercase(), ips))
                })
                .collect::<Result<_, DomainScanError>>()?;
        }

        if let Some(proxy) = file.proxy {
            if let Some(url) = proxy.source_url {
                config.proxy_source_url = url;
            }
            if let Some(ttl) = proxy.ttl {
                config.proxy_ttl = require_duration("proxy.ttl", &ttl)?;
            }
        }

        if let Some(scan) = file.scan {
            if let Some(tlds) = scan.tlds {
                config.tlds = tlds.into_iter().map(|tld| tld.to_lowercase()).collect();
            }
            if let Some(limit) = scan.default_concurrency {
                config.default_concurrency = limit;
            }
            if let Some(limits) = scan.concurrency {
                config.concurrency.extend(lowercase_keys(limits));
            }
        }

        Ok(config)
    }

    /// Apply environment overrides on top of the resolved file configuration.
    pub fn apply_env(&mut self, env_config: &EnvConfig) {
        if let Some(path) = &env_config.database {
            self.database_path = path.clone();
        }
        if let Some(level) = &env_config.log_level {
            self.logging.level = level.clone();
        }
        if let Some(path) = &env_config.log_file {
            self.logging.file = Some(path.clone());
        }
        if let Some(use_proxy) = env_config.use_proxy {
            self.use_proxy = use_proxy;
        }
    }

    /// Concurrency limit of the queue for `tld`.
    pub fn concurrency_for(&self, tld: &str) -> usize {
        self.concurrency
            .get(tld)
            .copied()
            .unwrap_or(self.default_concurrency)
    }
}

fn lowercase_keys<V>(map: HashMap<String, V>) -> HashMap<String, V> {
    map.into_iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_parse_duration_string() {
        assert_eq!(parse_duration_string("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration_string("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration_string("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration_string(" 30 "), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration_string("soon"), None);
        assert_eq!(parse_duration_string("5x"), None);
    }

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.tlds, vec!["ir", "com", "net", "org"]);
        assert_eq!(config.concurrency_for("ir"), 1);
        assert_eq!(config.concurrency_for("com"), 8);
        assert_eq!(config.whois_timeout, Duration::from_secs(5));
        assert_eq!(config.max_proxy_attempts, 10);
        assert_eq!(config.dns_servers["ir"].len(), 5);
        assert!(config.whois_servers.contains_key("ir"));
        assert!(!config.rdap_servers.contains_key("ir"));
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
[server]
port = 9090

[logging]
level = "debug"
console = false
file = "scan.log"

[database]
path = "/tmp/state.json"

[rdap.tlds]
com = "https://rdap.example.com/v1"

[whois]
use_proxy = false
timeout = "3s"
max_proxy_attempts = 4
[whois.tlds]
ir = "127.0.0.1:4343"

[dns.tlds]
IR = ["1.1.1.1"]

[proxy]
source_url = "http://proxies.local/{kind}.txt"
ttl = "30m"

[scan]
tlds = ["ir", "com"]
default_concurrency = 4
[scan.concurrency]
com = 2
"#,
        );

        let manager = ConfigManager::new(false);
        let config = ScanConfig::from_file_config(manager.load_file(file.path()).unwrap()).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.console);
        assert_eq!(config.logging.file, Some(PathBuf::from("scan.log")));
        assert_eq!(config.database_path, PathBuf::from("/tmp/state.json"));
        assert_eq!(config.rdap_servers.len(), 1);
        assert!(!config.use_proxy);
        assert_eq!(config.whois_timeout, Duration::from_secs(3));
        assert_eq!(config.max_proxy_attempts, 4);
        assert_eq!(config.whois_servers["ir"], "127.0.0.1:4343");
        assert_eq!(config.dns_servers["ir"], vec!["1.1.1.1".parse::<IpAddr>().unwrap()]);
        assert_eq!(config.proxy_ttl, Duration::from_secs(1800));
        assert_eq!(config.tlds, vec!["ir", "com"]);
        assert_eq!(config.concurrency_for("com"), 2);
        // Built-in limit survives a partial table
        assert_eq!(config.concurrency_for("ir"), 1);
        assert_eq!(config.concurrency_for("net"), 4);
    }

    #[test]
    fn test_invalid_concurrency() {
        let file = write_config("[scan]\ndefault_concurrency = 0\n");
        assert!(ConfigManager::new(false).load_file(file.path()).is_err());

        let file = write_config("[scan.concurrency]\nir = 101\n");
        assert!(ConfigManager::new(false).load_file(file.path()).is_err());
    }

    #[test]
    fn test_invalid_tables_are_rejected() {
        let cases = [
            "[whois.tlds]\nir = \"whois.nic.ir\"\n",
            "[rdap.tlds]\ncom = \"ftp://rdap.example.com\"\n",
            "[dns.tlds]\nir = [\"not-an-ip\"]\n",
            "[proxy]\nsource_url = \"http://proxies.local/list\"\n",
            "[proxy]\nttl = \"forever\"\n",
            "[whois]\nmax_proxy_attempts = 0\n",
            "[scan]\ntlds = [\"co.uk\"]\n",
        ];

        let manager = ConfigManager::new(false);
        for case in cases {
            let file = write_config(case);
            let err = manager.load_file(file.path()).unwrap_err();
            assert!(
                matches!(err, DomainScanError::ConfigError { .. }),
                "{case}: {err}"
            );
        }
    }

    #[test]
    fn test_malformed_toml() {
        let file = write_config("[scan\n");
        let err = ConfigManager::new(false).load_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("TOML"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let manager = ConfigManager::new(false);
        let err = manager
            .discover_and_load(Some(Path::new("/definitely/not/here.toml")))
            .unwrap_err();
        assert!(matches!(err, DomainScanError::FileError { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DS_DATABASE", "/var/lib/scan.json"),
            ("DS_LOG_LEVEL", "warn"),
            ("DS_USE_PROXY", "no"),
        ]);
        let env_config = env_config_from(|key| vars.get(key).map(|v| v.to_string()), false);

        assert_eq!(env_config.database, Some(PathBuf::from("/var/lib/scan.json")));
        assert_eq!(env_config.log_level.as_deref(), Some("warn"));
        assert_eq!(env_config.log_file, None);
        assert_eq!(env_config.use_proxy, Some(false));

        let mut config = ScanConfig::default();
        config.apply_env(&env_config);
        assert_eq!(config.database_path, PathBuf::from("/var/lib/scan.json"));
        assert_eq!(config.logging.level, "warn");
        assert!(!config.use_proxy);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("DS_USE_PROXY", "maybe"), ("DS_LOG_LEVEL", "  ")]);
        let env_config = env_config_from(|key| vars.get(key).map(|v| v.to_string()), false);
        assert_eq!(env_config, EnvConfig::default());
    }
}
