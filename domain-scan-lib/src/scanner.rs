//! Scan orchestration.
//!
//! The [`Scanner`] turns the stored pattern into domain checks, runs them on
//! one [`WorkQueue`] per TLD and records every status change through the
//! state store. A scan ends once all of its queues have gone idle.
//!
//! Status recording happens inside the queue observers, which run
//! synchronously before a queue reports itself idle. By the time the last
//! queue is discarded every finished check has therefore been recorded.

use crate::checker::DomainProbe;
use crate::config::ScanConfig;
use crate::error::DomainScanError;
use crate::generate::{validate_pattern, Expansion};
use crate::notify::ScanNotifier;
use crate::protocols::registry::{default_concurrency_limits, default_tlds, DEFAULT_CONCURRENCY};
use crate::queue::{QueueEvent, Work, WorkQueue};
use crate::report;
use crate::store::StateStore;
use crate::types::{CheckEvent, CheckRecord, CheckStatus, ProbeResult, ScanState};
use crate::utils::{is_valid_domain, match_tld};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Candidates examined between two yields to the scheduler.
const SUBMIT_BATCH: usize = 256;

/// One availability check, as run by a TLD queue.
pub struct DomainCheck {
    pub domain: String,
    probe: Arc<dyn DomainProbe>,
}

#[async_trait]
impl Work for DomainCheck {
    type Output = ProbeResult;

    async fn run(&self) -> Result<ProbeResult, DomainScanError> {
        self.probe.probe(&self.domain).await
    }
}

/// Which TLDs are scanned and how many checks each may run at once.
#[derive(Debug, Clone)]
pub struct ScanLimits {
    pub tlds: Vec<String>,
    pub default_concurrency: usize,
    pub concurrency: HashMap<String, usize>,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            tlds: default_tlds(),
            default_concurrency: DEFAULT_CONCURRENCY,
            concurrency: default_concurrency_limits(),
        }
    }
}

impl ScanLimits {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            tlds: config.tlds.clone(),
            default_concurrency: config.default_concurrency,
            concurrency: config.concurrency.clone(),
        }
    }

    pub fn concurrency_for(&self, tld: &str) -> usize {
        self.concurrency
            .get(tld)
            .copied()
            .unwrap_or(self.default_concurrency)
    }
}

/// Orchestrates a pattern scan across per-TLD work queues.
///
/// Cloning is cheap; clones drive the same scan.
#[derive(Clone)]
pub struct Scanner {
    inner: Arc<ScannerInner>,
}

struct ScannerInner {
    probe: Arc<dyn DomainProbe>,
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn ScanNotifier>,
    limits: ScanLimits,
    /// Live queues keyed by TLD
    queues: Mutex<HashMap<String, WorkQueue<DomainCheck>>>,
    /// Serializes read-modify-write sequences on the stored state
    state_lock: Mutex<()>,
    /// Number of start/stop calls in progress; end-of-scan waits for zero
    holds: AtomicUsize,
    /// Set by `stop()` so an in-progress submission stops early
    stopping: AtomicBool,
}

/// Keeps end-of-scan detection suspended while alive.
struct Hold<'a>(&'a AtomicUsize);

impl<'a> Hold<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Hold<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Scanner {
    pub fn new(
        probe: Arc<dyn DomainProbe>,
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn ScanNotifier>,
        limits: ScanLimits,
    ) -> Self {
        Self {
            inner: Arc::new(ScannerInner {
                probe,
                store,
                notifier,
                limits,
                queues: Mutex::new(HashMap::new()),
                state_lock: Mutex::new(()),
                holds: AtomicUsize::new(0),
                stopping: AtomicBool::new(false),
            }),
        }
    }

    /// Accept a new pattern and start scanning it.
    ///
    /// Checks recorded by a previous scan of the very same pattern (and regex
    /// flag) are kept and not re-run.
    pub async fn launch(&self, pattern: &str, is_regex: bool) -> Result<(), DomainScanError> {
        {
            let _guard = self.inner.lock_state();
            let previous = self.inner.store.load_state();
            if previous.running {
                return Err(DomainScanError::AlreadyRunning);
            }

            let count = validate_pattern(pattern, is_regex)?;
            tracing::info!(pattern, is_regex, count, "Launching scan");

            let state = ScanState::launch(&previous, pattern, is_regex);
            self.inner.store.save_state(&state)?;
            self.inner.notifier.state_changed(&state);
        }

        self.start().await
    }

    /// Submit every unchecked candidate of the stored scan.
    ///
    /// Does nothing when the stored scan is not running. Checks left in the
    /// running status by an interrupted process are run again.
    pub async fn start(&self) -> Result<(), DomainScanError> {
        let hold = Hold::new(&self.inner.holds);
        let result = self.inner.submit_all().await;
        drop(hold);

        self.inner.check_end_of_scan();
        result
    }

    /// Stop the running scan.
    ///
    /// Pending checks are canceled; checks already running are allowed to
    /// finish and are still recorded.
    pub async fn stop(&self) -> Result<(), DomainScanError> {
        let _hold = Hold::new(&self.inner.holds);

        {
            let _guard = self.inner.lock_state();
            if !self.inner.store.load_state().running {
                return Err(DomainScanError::NotRunning);
            }
        }
        self.inner.stopping.store(true, Ordering::SeqCst);

        let queues: Vec<WorkQueue<DomainCheck>> = self
            .inner
            .lock_queues()
            .drain()
            .map(|(_, queue)| queue)
            .collect();
        tracing::info!(queues = queues.len(), "Stopping scan");

        futures::future::join_all(queues.iter().map(|queue| queue.stop())).await;

        let _guard = self.inner.lock_state();
        let mut state = self.inner.store.load_state();
        state.running = false;
        self.inner.store.save_state(&state)?;
        self.inner.notifier.state_changed(&state);

        Ok(())
    }

    /// Status view of the stored scan: only available and running checks.
    pub fn state(&self) -> ScanState {
        self.inner.store.load_state().view()
    }

    /// CSV of every available domain.
    pub fn export_csv(&self) -> Result<String, DomainScanError> {
        report::export_csv(&self.inner.store.load_state())
    }

    /// True while any TLD queue of this scanner is alive.
    pub fn is_active(&self) -> bool {
        !self.inner.lock_queues().is_empty()
    }
}

impl ScannerInner {
    fn lock_state(&self) -> MutexGuard<'_, ()> {
        self.state_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_queues(&self) -> MutexGuard<'_, HashMap<String, WorkQueue<DomainCheck>>> {
        self.queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn submit_all(self: &Arc<Self>) -> Result<(), DomainScanError> {
        let (pattern, is_regex) = {
            let _guard = self.lock_state();
            if !self.lock_queues().is_empty() {
                return Err(DomainScanError::AlreadyRunning);
            }

            let state = self.store.load_state();
            let pattern = match (state.running, &state.pattern) {
                (true, Some(pattern)) => pattern.clone(),
                _ => return Ok(()),
            };
            self.stopping.store(false, Ordering::SeqCst);

            let interrupted: Vec<String> = state
                .checks
                .iter()
                .flatten()
                .filter(|(_, record)| record.status == CheckStatus::Running)
                .map(|(domain, _)| domain.clone())
                .collect();
            for domain in interrupted {
                self.clear_status(&domain)?;
            }

            (pattern, state.is_regex.unwrap_or(false))
        };

        let expansion = Expansion::from_pattern(&pattern, is_regex)?;
        let mut seen = HashSet::new();
        let mut submitted = 0usize;

        for (index, domain) in expansion.iter().enumerate() {
            if index > 0 && index % SUBMIT_BATCH == 0 {
                tokio::task::yield_now().await;
            }
            if self.stopping.load(Ordering::SeqCst) {
                tracing::debug!(submitted, "Scan stopped during submission");
                break;
            }
            if !is_valid_domain(&domain) {
                continue;
            }
            let Some(tld) = match_tld(&domain, &self.limits.tlds) else {
                continue;
            };
            if !seen.insert(domain.clone()) {
                continue;
            }
            if matches!(
                self.store.domain_status(&domain),
                Some(record) if record.status != CheckStatus::Running
            ) {
                continue;
            }

            let check = DomainCheck {
                domain,
                probe: Arc::clone(&self.probe),
            };
            if !self.submit(tld, check) {
                tracing::debug!(submitted, "Scan stopped during submission");
                break;
            }
            submitted += 1;
        }

        tracing::info!(pattern = %pattern, submitted, "Submitted domain checks");
        Ok(())
    }

    /// Enqueue a check on the live queue for `tld`, creating it on first use.
    ///
    /// Returns false once `stop()` has begun. The queues lock is held across
    /// the enqueue so nothing lands on a queue that `stop()` already drained.
    fn submit(self: &Arc<Self>, tld: &str, check: DomainCheck) -> bool {
        let mut queues = self.lock_queues();
        if self.stopping.load(Ordering::SeqCst) {
            return false;
        }

        let queue = queues
            .entry(tld.to_string())
            .or_insert_with(|| self.new_queue(tld));
        // Outcomes are recorded by the queue observer
        let _ = queue.enqueue(check);
        true
    }

    fn new_queue(self: &Arc<Self>, tld: &str) -> WorkQueue<DomainCheck> {
        let queue = WorkQueue::new(tld, self.limits.concurrency_for(tld));
        tracing::debug!(queue = queue.name(), limit = queue.limit(), "Created work queue");

        let scanner = Arc::downgrade(self);
        queue.on_event(move |event| {
            if let Some(scanner) = scanner.upgrade() {
                scanner.on_queue_event(event);
            }
        });
        queue
    }

    fn on_queue_event(&self, event: &QueueEvent<'_, DomainCheck>) {
        let outcome = match event {
            QueueEvent::Started(check) => {
                self.record_status(&check.domain, CheckStatus::Running)
            }
            QueueEvent::Done(check, result) => {
                tracing::debug!(
                    domain = %check.domain,
                    available = result.available,
                    method = ?result.method,
                    "Check finished"
                );
                self.record_status(&check.domain, result.status())
            }
            QueueEvent::Failed(_, error) if error.is_canceled() => Ok(()),
            QueueEvent::Failed(check, error) => {
                tracing::warn!(
                    domain = %check.domain,
                    error = %error,
                    retryable = error.is_retryable(),
                    "Check failed, recording as taken"
                );
                self.record_status(&check.domain, CheckStatus::Taken)
            }
            QueueEvent::Idle => {
                self.check_end_of_scan();
                Ok(())
            }
            QueueEvent::Added(_) | QueueEvent::Finished(_) | QueueEvent::Empty => Ok(()),
        };

        if let Err(e) = outcome {
            tracing::error!(error = %e, "Failed to persist scan state");
        }
    }

    fn record_status(&self, domain: &str, status: CheckStatus) -> Result<(), DomainScanError> {
        let record = CheckRecord::now(status);
        {
            let _guard = self.lock_state();
            self.store.set_domain_status(domain, Some(record))?;
        }
        self.notifier.check_changed(CheckEvent {
            domain: domain.to_string(),
            status: Some(status),
            modified_at: record.modified_at,
        });
        Ok(())
    }

    /// Caller holds the state lock.
    fn clear_status(&self, domain: &str) -> Result<(), DomainScanError> {
        self.store.set_domain_status(domain, None)?;
        self.notifier.check_changed(CheckEvent {
            domain: domain.to_string(),
            status: None,
            modified_at: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Discard idle queues and end the scan when none are left.
    fn check_end_of_scan(&self) {
        let _guard = self.lock_state();
        if self.holds.load(Ordering::SeqCst) > 0 {
            return;
        }

        {
            let mut queues = self.lock_queues();
            queues.retain(|_, queue| !queue.is_idle());
            if !queues.is_empty() {
                return;
            }
        }

        let mut state = self.store.load_state();
        if !state.running {
            return;
        }

        state.running = false;
        match self.store.save_state(&state) {
            Ok(()) => {
                tracing::info!(
                    available = state.count(CheckStatus::Available),
                    taken = state.count(CheckStatus::Taken),
                    "Scan finished"
                );
                self.notifier.state_changed(&state);
            }
            Err(e) => tracing::error!(error = %e, "Failed to persist finished scan"),
        }
    }
}
