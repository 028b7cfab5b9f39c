//! CSV export of available domains.

use crate::error::DomainScanError;
use crate::types::{CheckStatus, ScanState};
use chrono::SecondsFormat;

/// Header row of the export.
pub const CSV_HEADER: &str = "Domain,Last Check";

/// Render every available domain of `state` as CSV with CRLF line endings.
///
/// Fails with [`DomainScanError::NothingToExport`] when the state never held
/// a check map. An empty map exports the header alone.
pub fn export_csv(state: &ScanState) -> Result<String, DomainScanError> {
    let checks = state
        .checks
        .as_ref()
        .ok_or(DomainScanError::NothingToExport)?;

    let mut csv = format!("{}\r\n", CSV_HEADER);
    for (domain, record) in checks
        .iter()
        .filter(|(_, record)| record.status == CheckStatus::Available)
    {
        csv.push_str(&format!(
            "{},{}\r\n",
            domain,
            record.modified_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        ));
    }

    Ok(csv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CheckRecord;
    use chrono::DateTime;
    use std::collections::BTreeMap;

    fn record(status: CheckStatus, millis: i64) -> CheckRecord {
        CheckRecord {
            status,
            modified_at: DateTime::from_timestamp_millis(millis).unwrap(),
        }
    }

    #[test]
    fn test_only_available_rows_are_exported() {
        let mut checks = BTreeMap::new();
        checks.insert("aa.ir".to_string(), record(CheckStatus::Available, 1_700_000_000_123));
        checks.insert("ab.ir".to_string(), record(CheckStatus::Taken, 1_700_000_000_000));
        checks.insert("ac.ir".to_string(), record(CheckStatus::Running, 1_700_000_000_000));
        let state = ScanState {
            running: false,
            pattern: Some("a%w.ir".to_string()),
            is_regex: Some(false),
            checks: Some(checks),
        };

        assert_eq!(
            export_csv(&state).unwrap(),
            "Domain,Last Check\r\naa.ir,2023-11-14T22:13:20.123Z\r\n"
        );
    }

    #[test]
    fn test_header_only_when_nothing_is_available() {
        let mut checks = BTreeMap::new();
        checks.insert("ab.com".to_string(), record(CheckStatus::Taken, 0));
        let state = ScanState {
            checks: Some(checks),
            ..ScanState::default()
        };
        assert_eq!(export_csv(&state).unwrap(), "Domain,Last Check\r\n");
    }

    #[test]
    fn test_missing_checks_is_an_error() {
        let err = export_csv(&ScanState::default()).unwrap_err();
        assert!(matches!(err, DomainScanError::NothingToExport));
    }

    #[test]
    fn test_empty_checks_export_header_only() {
        let empty = ScanState {
            checks: Some(BTreeMap::new()),
            ..ScanState::default()
        };
        assert_eq!(export_csv(&empty).unwrap(), "Domain,Last Check\r\n");
    }
}
