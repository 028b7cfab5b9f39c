//! Error handling for scanning operations.
//!
//! One error type covers every failure mode of the library: invalid patterns,
//! protocol failures of a single domain check, proxy exhaustion, queue
//! cancellation and scan lifecycle violations.

use std::fmt;
use std::time::Duration;

/// Main error type for domain scanning operations.
#[derive(Debug, Clone)]
pub enum DomainScanError {
    /// Invalid domain name format
    InvalidDomain { domain: String, reason: String },

    /// A user supplied value was rejected before any work started
    InvalidPattern { input: String, message: String },

    /// Network-related errors (connection, I/O, etc.)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// RDAP protocol specific errors
    RdapError {
        domain: String,
        message: String,
        status_code: Option<u16>,
    },

    /// DNS resolution failed for a reason other than "no such domain"
    DnsError { domain: String, message: String },

    /// WHOIS protocol specific errors
    WhoisError { domain: String, message: String },

    /// SOCKS handshake with a proxy failed
    ProxyError { proxy: String, message: String },

    /// No proxy endpoint of any supported kind is left to try
    NoProxyAvailable,

    /// Proxy failover gave up after the configured number of attempts
    ProxyAttemptsExhausted { attempts: usize },

    /// The proxy list source could not be downloaded
    ProxyListError { kind: String, message: String },

    /// Configuration errors (invalid settings, missing servers, etc.)
    ConfigError { message: String },

    /// File I/O errors when reading or writing state and config
    FileError { path: String, message: String },

    /// Timeout errors when operations take too long
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Work was removed from a queue before it started
    Canceled,

    /// A scan was started while another one is running
    AlreadyRunning,

    /// A scan was stopped while none is running
    NotRunning,

    /// Export was requested but no checks were ever recorded
    NothingToExport,

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl DomainScanError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid pattern error naming the offending input.
    pub fn invalid_pattern<I: Into<String>, M: Into<String>>(input: I, message: M) -> Self {
        Self::InvalidPattern {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new RDAP error.
    pub fn rdap<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::RdapError {
            domain: domain.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a new RDAP error with HTTP status code.
    pub fn rdap_with_status<D: Into<String>, M: Into<String>>(
        domain: D,
        message: M,
        status_code: u16,
    ) -> Self {
        Self::RdapError {
            domain: domain.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a new DNS error.
    pub fn dns<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::DnsError {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new WHOIS error.
    pub fn whois<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::WhoisError {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new proxy handshake error.
    pub fn proxy<P: Into<String>, M: Into<String>>(proxy: P, message: M) -> Self {
        Self::ProxyError {
            proxy: proxy.into(),
            message: message.into(),
        }
    }

    /// Create a new proxy list download error.
    pub fn proxy_list<K: Into<String>, M: Into<String>>(kind: K, message: M) -> Self {
        Self::ProxyListError {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True when the error only means "removed from the queue before it ran".
    ///
    /// Canceled work must never be recorded as a domain status.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Check if this error suggests the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. }
                | Self::Timeout { .. }
                | Self::ProxyError { .. }
                | Self::RdapError {
                    status_code: Some(500..=599),
                    ..
                }
        )
    }
}

impl fmt::Display for DomainScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::InvalidPattern { input, message } => {
                write!(f, "Invalid {}: {}", input, message)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::RdapError {
                domain,
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "RDAP error for '{}' (HTTP {}): {}", domain, code, message)
                } else {
                    write!(f, "RDAP error for '{}': {}", domain, message)
                }
            }
            Self::DnsError { domain, message } => {
                write!(f, "DNS error for '{}': {}", domain, message)
            }
            Self::WhoisError { domain, message } => {
                write!(f, "WHOIS error for '{}': {}", domain, message)
            }
            Self::ProxyError { proxy, message } => {
                write!(f, "Proxy error via {}: {}", proxy, message)
            }
            Self::NoProxyAvailable => write!(f, "No SOCKS proxy available"),
            Self::ProxyAttemptsExhausted { attempts } => {
                write!(f, "Gave up after {} proxy connection attempts", attempts)
            }
            Self::ProxyListError { kind, message } => {
                write!(f, "Failed to load {} proxy list: {}", kind, message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::Canceled => write!(f, "canceled"),
            Self::AlreadyRunning => write!(
                f,
                "Currently there is a scan running. You should stop that first"
            ),
            Self::NotRunning => write!(
                f,
                "Currently there is no scan running. You should start first"
            ),
            Self::NothingToExport => write!(f, "There is nothing to export"),
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for DomainScanError {}

impl From<reqwest::Error> for DomainScanError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", Duration::from_secs(30))
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for DomainScanError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for DomainScanError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            Self::network_with_source("Operation timed out", err.to_string())
        } else {
            Self::network_with_source("I/O error", err.to_string())
        }
    }
}

impl From<toml::de::Error> for DomainScanError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML configuration: {}", err))
    }
}

impl From<regex_syntax::Error> for DomainScanError {
    fn from(err: regex_syntax::Error) -> Self {
        Self::invalid_pattern("pattern", format!("Invalid pattern: {}", err))
    }
}

impl From<trust_dns_resolver::error::ResolveError> for DomainScanError {
    fn from(err: trust_dns_resolver::error::ResolveError) -> Self {
        Self::network_with_source("DNS resolution failed", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canceled_is_distinguished() {
        assert!(DomainScanError::Canceled.is_canceled());
        assert!(!DomainScanError::NoProxyAvailable.is_canceled());
        assert!(!DomainScanError::network("boom").is_canceled());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(DomainScanError::network("reset").is_retryable());
        assert!(DomainScanError::timeout("WHOIS query", Duration::from_secs(5)).is_retryable());
        assert!(DomainScanError::rdap_with_status("a.com", "server error", 503).is_retryable());
        assert!(!DomainScanError::rdap_with_status("a.com", "bad request", 400).is_retryable());
        assert!(!DomainScanError::NoProxyAvailable.is_retryable());
    }

    #[test]
    fn test_invalid_pattern_names_input() {
        let err = DomainScanError::invalid_pattern(
            "pattern",
            "This pattern makes invalid domain names: -a.com",
        );
        let text = err.to_string();
        assert!(text.contains("pattern"));
        assert!(text.contains("-a.com"));
    }

    #[test]
    fn test_proxy_exhaustion_messages_differ() {
        let none = DomainScanError::NoProxyAvailable.to_string();
        let capped = DomainScanError::ProxyAttemptsExhausted { attempts: 10 }.to_string();
        assert_ne!(none, capped);
        assert!(capped.contains("10"));
    }
}
