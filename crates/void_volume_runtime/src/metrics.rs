//! Transition counters fed by an engine observer

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use void_volumes::{TransitionEvent, TransitionHandler, TransitionKind};

/// Enter/leave counts for one volume
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VolumeCounts {
    pub enters: u64,
    pub leaves: u64,
}

/// Shared per-volume transition counters
#[derive(Debug, Clone, Default)]
pub struct TransitionMetrics {
    counts: Arc<Mutex<BTreeMap<String, VolumeCounts>>>,
}

impl TransitionMetrics {
    /// Create empty counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Observer that records into these counters
    pub fn handler(&self) -> TransitionHandler {
        let enters = self.clone();
        let leaves = self.clone();
        TransitionHandler::new()
            .on_enter(move |event| enters.record(event))
            .on_leave(move |event| leaves.record(event))
    }

    fn record(&self, event: &TransitionEvent) {
        let mut counts = self.counts.lock();
        let entry = counts.entry(event.volume.clone()).or_default();
        match event.kind {
            TransitionKind::Enter => entry.enters += 1,
            TransitionKind::Leave => entry.leaves += 1,
        }
    }

    /// Counts for one volume key
    pub fn get(&self, volume: &str) -> VolumeCounts {
        self.counts.lock().get(volume).copied().unwrap_or_default()
    }

    /// Snapshot of every counter, ordered by volume key
    pub fn snapshot(&self) -> Vec<(String, VolumeCounts)> {
        self.counts
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}
