//! Rendezvous between the scheduler and the many waiting sessions.

use tokio::sync::watch;

use super::types::CycleReport;

/// Broadcast points for the two cycle events.
///
/// Both are `watch` channels: every subscriber wakes once per published
/// value, a slow subscriber only ever sees the latest value, and nothing is
/// replayed.
pub struct CycleHub {
    window: watch::Sender<u64>,
    complete: watch::Sender<CycleReport>,
}

impl CycleHub {
    pub fn new() -> Self {
        let (window, _) = watch::channel(0);
        let (complete, _) = watch::channel(CycleReport::initial());
        Self { window, complete }
    }

    /// Announces that the ingestion window for `cycle` is open.
    pub fn open_window(&self, cycle: u64) {
        self.window.send_replace(cycle);
    }

    /// Publishes a finished cycle.
    pub fn publish(&self, report: CycleReport) {
        self.complete.send_replace(report);
    }

    /// Receiver that wakes on the next window; the current one counts as seen.
    pub fn subscribe_window(&self) -> watch::Receiver<u64> {
        self.window.subscribe()
    }

    /// Receiver that wakes on the next completed cycle.
    pub fn subscribe_complete(&self) -> watch::Receiver<CycleReport> {
        self.complete.subscribe()
    }

    /// Most recently completed cycle.
    pub fn latest(&self) -> CycleReport {
        self.complete.borrow().clone()
    }
}

impl Default for CycleHub {
    fn default() -> Self {
        Self::new()
    }
}
