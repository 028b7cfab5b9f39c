//! Persistence of the scan state.
//!
//! The store hands out copies of the state and takes copies back; nothing
//! outside the store ever holds a reference into the stored record.

use crate::error::DomainScanError;
use crate::types::{CheckRecord, ScanState};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Copy-in/copy-out access to the persisted [`ScanState`].
pub trait StateStore: Send + Sync {
    /// Current state, or the default (not running) state.
    fn load_state(&self) -> ScanState;

    /// Replace the whole state.
    fn save_state(&self, state: &ScanState) -> Result<(), DomainScanError>;

    /// Recorded status of one domain.
    fn domain_status(&self, domain: &str) -> Option<CheckRecord>;

    /// Record a domain's status; `None` removes the record.
    fn set_domain_status(
        &self,
        domain: &str,
        record: Option<CheckRecord>,
    ) -> Result<(), DomainScanError>;
}

fn apply_status(state: &mut ScanState, domain: &str, record: Option<CheckRecord>) {
    match record {
        Some(record) => {
            state
                .checks
                .get_or_insert_with(Default::default)
                .insert(domain.to_string(), record);
        }
        None => {
            if let Some(checks) = state.checks.as_mut() {
                checks.remove(domain);
            }
        }
    }
}

fn lock(state: &Mutex<ScanState>) -> MutexGuard<'_, ScanState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Store keeping the state in memory only.
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<ScanState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `state`.
    pub fn with_state(state: ScanState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl StateStore for MemoryStateStore {
    fn load_state(&self) -> ScanState {
        lock(&self.state).clone()
    }

    fn save_state(&self, state: &ScanState) -> Result<(), DomainScanError> {
        *lock(&self.state) = state.clone();
        Ok(())
    }

    fn domain_status(&self, domain: &str) -> Option<CheckRecord> {
        lock(&self.state)
            .checks
            .as_ref()
            .and_then(|checks| checks.get(domain).copied())
    }

    fn set_domain_status(
        &self,
        domain: &str,
        record: Option<CheckRecord>,
    ) -> Result<(), DomainScanError> {
        apply_status(&mut lock(&self.state), domain, record);
        Ok(())
    }
}

/// On-disk document layout.
#[derive(Debug, Default, Deserialize)]
struct Document {
    #[serde(rename = "scanState", default)]
    scan_state: ScanState,
}

/// Store backed by a pretty-printed JSON file, rewritten after every change.
pub struct JsonStateStore {
    path: PathBuf,
    state: Mutex<ScanState>,
}

impl JsonStateStore {
    /// Open (or lazily create) the database file at `path`.
    ///
    /// A missing or unreadable file starts from the default state.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = match Self::read(&path) {
            Ok(state) => state,
            Err(e) => {
                if path.exists() {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable state file");
                }
                ScanState::default()
            }
        };

        Self {
            path,
            state: Mutex::new(state),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Result<ScanState, DomainScanError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DomainScanError::file_error(path.display().to_string(), e.to_string()))?;
        let document: Document = serde_json::from_str(&content)?;
        Ok(document.scan_state)
    }

    fn persist(&self, state: &ScanState) -> Result<(), DomainScanError> {
        let json = serde_json::to_string_pretty(&DocumentRef { scan_state: state })?;
        let display = self.path.display().to_string();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| DomainScanError::file_error(&display, e.to_string()))?;
        }

        // Write then rename so a crash never leaves a truncated file behind
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| DomainScanError::file_error(&display, e.to_string()))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| DomainScanError::file_error(&display, e.to_string()))
    }
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    #[serde(rename = "scanState")]
    scan_state: &'a ScanState,
}

impl StateStore for JsonStateStore {
    fn load_state(&self) -> ScanState {
        lock(&self.state).clone()
    }

    fn save_state(&self, state: &ScanState) -> Result<(), DomainScanError> {
        let mut current = lock(&self.state);
        *current = state.clone();
        self.persist(&current)
    }

    fn domain_status(&self, domain: &str) -> Option<CheckRecord> {
        lock(&self.state)
            .checks
            .as_ref()
            .and_then(|checks| checks.get(domain).copied())
    }

    fn set_domain_status(
        &self,
        domain: &str,
        record: Option<CheckRecord>,
    ) -> Result<(), DomainScanError> {
        let mut current = lock(&self.state);
        apply_status(&mut current, domain, record);
        self.persist(&current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CheckStatus;
    use tempfile::TempDir;

    fn running_state() -> ScanState {
        ScanState {
            running: true,
            pattern: Some("a*.com".to_string()),
            is_regex: Some(false),
            checks: None,
        }
    }

    #[test]
    fn test_memory_store_copy_semantics() {
        let store = MemoryStateStore::new();
        let mut state = running_state();
        store.save_state(&state).unwrap();

        // Mutating the caller's copy does not touch the store
        state.running = false;
        assert!(store.load_state().running);

        store
            .set_domain_status("ab.com", Some(CheckRecord::now(CheckStatus::Running)))
            .unwrap();
        assert_eq!(
            store.domain_status("ab.com").map(|r| r.status),
            Some(CheckStatus::Running)
        );

        store.set_domain_status("ab.com", None).unwrap();
        assert!(store.domain_status("ab.com").is_none());
        assert!(store.load_state().checks.unwrap().is_empty());
    }

    #[test]
    fn test_json_store_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");

        let store = JsonStateStore::open(&path);
        assert_eq!(store.load_state(), ScanState::default());

        store.save_state(&running_state()).unwrap();
        store
            .set_domain_status("ab.com", Some(CheckRecord::now(CheckStatus::Available)))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["scanState"]["running"], serde_json::json!(true));
        assert_eq!(raw["scanState"]["checks"]["ab.com"]["status"], "available");
        assert!(raw["scanState"]["checks"]["ab.com"]["modifiedAt"].is_i64());

        // Timestamps lose sub-millisecond precision on disk
        let reopened = JsonStateStore::open(&path).load_state();
        assert!(reopened.running);
        assert_eq!(reopened.pattern.as_deref(), Some("a*.com"));
        assert_eq!(
            reopened.checks.unwrap()["ab.com"].status,
            CheckStatus::Available
        );
    }

    #[test]
    fn test_json_store_ignores_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonStateStore::open(&path);
        assert!(!store.load_state().running);
    }

    #[test]
    fn test_json_store_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = JsonStateStore::open(&path);
        store.save_state(&running_state()).unwrap();
        assert!(path.exists());
    }
}
