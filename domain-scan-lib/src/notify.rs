//! Notification of scan progress to interested front ends.

use crate::types::{CheckEvent, ScanEvent, ScanState};
use tokio::sync::broadcast;

/// Receives state and per-domain status changes. Fire-and-forget.
pub trait ScanNotifier: Send + Sync {
    fn state_changed(&self, state: &ScanState);
    fn check_changed(&self, event: CheckEvent);
}

/// Notifier that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl ScanNotifier for NullNotifier {
    fn state_changed(&self, _state: &ScanState) {}
    fn check_changed(&self, _event: CheckEvent) {}
}

/// Notifier fanning events out over a `tokio` broadcast channel.
///
/// State events carry the status view (available and running checks only).
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<ScanEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.tx.subscribe()
    }

    fn send(&self, event: ScanEvent) {
        // No subscribers is not an error
        let _ = self.tx.send(event);
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl ScanNotifier for BroadcastNotifier {
    fn state_changed(&self, state: &ScanState) {
        self.send(ScanEvent::State(state.view()));
    }

    fn check_changed(&self, event: CheckEvent) {
        self.send(ScanEvent::Check(event));
    }
}
