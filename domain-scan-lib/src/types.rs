//! Core data types for domain scanning.
//!
//! This module defines the persisted scan state, per-domain check records,
//! probe results, proxy endpoints and the events broadcast while a scan runs.

use crate::error::DomainScanError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Status recorded for a single domain in the scan state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// The check has started and has not finished yet
    Running,

    /// The domain can be registered
    Available,

    /// The domain is registered, or its status could not be determined
    Taken,
}

/// One entry of the per-domain status map.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckRecord {
    pub status: CheckStatus,

    /// When the status last changed (epoch milliseconds on disk)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub modified_at: DateTime<Utc>,
}

impl CheckRecord {
    /// Create a record stamped with the current time.
    pub fn now(status: CheckStatus) -> Self {
        Self {
            status,
            modified_at: Utc::now(),
        }
    }
}

/// Durable record of the current scan.
///
/// `checks` survives a relaunch only when both the pattern and the regex flag
/// are unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScanState {
    pub running: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_regex: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checks: Option<BTreeMap<String, CheckRecord>>,
}

impl ScanState {
    /// A fresh running state for a newly accepted pattern.
    ///
    /// Accumulated checks are carried over from `previous` when it scanned the
    /// very same pattern, otherwise they are dropped.
    pub fn launch(previous: &ScanState, pattern: &str, is_regex: bool) -> Self {
        let same_pattern =
            previous.pattern.as_deref() == Some(pattern) && previous.is_regex == Some(is_regex);

        Self {
            running: true,
            pattern: Some(pattern.to_string()),
            is_regex: Some(is_regex),
            checks: if same_pattern {
                previous.checks.clone()
            } else {
                None
            },
        }
    }

    /// Status view of the state: only available and in-flight checks are kept.
    pub fn view(&self) -> ScanState {
        let checks = self.checks.as_ref().map(|checks| {
            checks
                .iter()
                .filter(|(_, record)| {
                    matches!(record.status, CheckStatus::Available | CheckStatus::Running)
                })
                .map(|(domain, record)| (domain.clone(), *record))
                .collect()
        });

        ScanState {
            running: self.running,
            pattern: self.pattern.clone(),
            is_regex: self.is_regex,
            checks,
        }
    }

    /// Number of recorded checks with the given status.
    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks
            .as_ref()
            .map(|checks| checks.values().filter(|r| r.status == status).count())
            .unwrap_or(0)
    }
}

/// Which step of the probe chain produced the answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CheckMethod {
    #[serde(rename = "rdap")]
    Rdap,

    #[serde(rename = "dns")]
    Dns,

    #[serde(rename = "whois")]
    Whois,
}

/// Outcome of probing one domain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeResult {
    pub available: bool,
    pub method: CheckMethod,
}

impl ProbeResult {
    pub fn new(available: bool, method: CheckMethod) -> Self {
        Self { available, method }
    }

    /// Terminal status to record for this result.
    pub fn status(&self) -> CheckStatus {
        if self.available {
            CheckStatus::Available
        } else {
            CheckStatus::Taken
        }
    }
}

/// SOCKS protocol flavour a proxy endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    Socks4,
    Socks5,
}

impl ProxyKind {
    /// Kinds in the order the WHOIS step draws from them.
    pub const ALL: [ProxyKind; 2] = [ProxyKind::Socks4, ProxyKind::Socks5];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyKind::Socks4 => "socks4",
            ProxyKind::Socks5 => "socks5",
        }
    }
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `host:port` pair of a proxy server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
}

impl ProxyEndpoint {
    pub fn new<H: Into<String>>(host: H, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ProxyEndpoint {
    type Err = DomainScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = parse_host_port(s)?;
        Ok(Self { host, port })
    }
}

/// Split a `host:port` string, as used by proxy lists and the WHOIS table.
pub fn parse_host_port(value: &str) -> Result<(String, u16), DomainScanError> {
    let value = value.trim();
    let (host, port) = value.rsplit_once(':').ok_or_else(|| {
        DomainScanError::config(format!("'{}' is not in host:port form", value))
    })?;

    let host = host.trim();
    if host.is_empty() {
        return Err(DomainScanError::config(format!(
            "'{}' has an empty host",
            value
        )));
    }

    let port = port
        .trim()
        .parse::<u16>()
        .map_err(|_| DomainScanError::config(format!("'{}' has an invalid port", value)))?;

    Ok((host.to_string(), port))
}

/// Per-domain status change pushed to the notifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckEvent {
    pub domain: String,

    /// `None` when the record was cleared before a re-run
    pub status: Option<CheckStatus>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub modified_at: DateTime<Utc>,
}

/// Everything a notifier subscriber can receive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ScanEvent {
    #[serde(rename = "scan.state")]
    State(ScanState),

    #[serde(rename = "scan.check")]
    Check(CheckEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: CheckStatus) -> CheckRecord {
        CheckRecord::now(status)
    }

    #[test]
    fn test_launch_carries_checks_for_same_pattern() {
        let mut checks = BTreeMap::new();
        checks.insert("ab.com".to_string(), record(CheckStatus::Available));
        let previous = ScanState {
            running: false,
            pattern: Some("a*.com".to_string()),
            is_regex: Some(false),
            checks: Some(checks),
        };

        let same = ScanState::launch(&previous, "a*.com", false);
        assert!(same.running);
        assert_eq!(same.checks, previous.checks);

        let other = ScanState::launch(&previous, "b*.com", false);
        assert!(other.checks.is_none());

        // Same text but now interpreted as a regex is a different scan
        let flag_changed = ScanState::launch(&previous, "a*.com", true);
        assert!(flag_changed.checks.is_none());
    }

    #[test]
    fn test_view_keeps_available_and_running() {
        let mut checks = BTreeMap::new();
        checks.insert("aa.com".to_string(), record(CheckStatus::Available));
        checks.insert("ab.com".to_string(), record(CheckStatus::Taken));
        checks.insert("ac.com".to_string(), record(CheckStatus::Running));
        let state = ScanState {
            running: true,
            pattern: Some("a%w.com".to_string()),
            is_regex: Some(false),
            checks: Some(checks),
        };

        let view = state.view();
        let kept = view.checks.unwrap();
        assert_eq!(kept.len(), 2);
        assert!(kept.contains_key("aa.com"));
        assert!(kept.contains_key("ac.com"));
        assert_eq!(state.count(CheckStatus::Taken), 1);
    }

    #[test]
    fn test_state_json_shape() {
        let mut checks = BTreeMap::new();
        checks.insert(
            "ab.ir".to_string(),
            CheckRecord {
                status: CheckStatus::Taken,
                modified_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            },
        );
        let state = ScanState {
            running: true,
            pattern: Some("ab.ir".to_string()),
            is_regex: Some(false),
            checks: Some(checks),
        };

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["isRegex"], serde_json::json!(false));
        assert_eq!(json["checks"]["ab.ir"]["status"], "taken");
        assert_eq!(
            json["checks"]["ab.ir"]["modifiedAt"],
            serde_json::json!(1_700_000_000_000i64)
        );

        let back: ScanState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_parse_proxy_endpoint() {
        let endpoint: ProxyEndpoint = "10.0.0.1:1080".parse().unwrap();
        assert_eq!(endpoint, ProxyEndpoint::new("10.0.0.1", 1080));
        assert_eq!(endpoint.to_string(), "10.0.0.1:1080");

        assert!("10.0.0.1".parse::<ProxyEndpoint>().is_err());
        assert!(":1080".parse::<ProxyEndpoint>().is_err());
        assert!("host:notaport".parse::<ProxyEndpoint>().is_err());
    }

    #[test]
    fn test_probe_result_status() {
        assert_eq!(
            ProbeResult::new(true, CheckMethod::Dns).status(),
            CheckStatus::Available
        );
        assert_eq!(
            ProbeResult::new(false, CheckMethod::Rdap).status(),
            CheckStatus::Taken
        );
    }
}
