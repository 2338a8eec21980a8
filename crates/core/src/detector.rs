//! Debounced arrival detection
//!
//! Downloads and local copies produce a burst of create/modify events
//! (usually 4-10) for the same file. The detector keeps only the most
//! recent one and reports the file as ready once no further event has
//! arrived for longer than the stable threshold.
//!
//! The detector is a single slot: if a second file produces events while
//! the first is still settling, the first arrival is dropped.

use crate::event::{ChangeEvent, ChangeSink};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::debug;

/// Idle time after the last event before a file counts as fully written
pub const STABLE_THRESHOLD: Duration = Duration::from_secs(1);

/// A pending arrival that has not been claimed yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingArrival {
    /// Path from the most recent event
    pub path: PathBuf,
    /// Observation time of the most recent event
    pub last_event_at: Instant,
}

/// Detector state
///
/// `pending` is `Some` exactly when an arrival is waiting, so the path and
/// the last event time are always set together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectorState {
    /// Unclaimed arrival, if any
    pub pending: Option<PendingArrival>,
}

impl DetectorState {
    /// Whether an arrival is waiting
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Time of the most recent event, if pending
    pub fn last_event_at(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.last_event_at)
    }

    /// Path of the pending arrival
    pub fn pending_path(&self) -> Option<&PathBuf> {
        self.pending.as_ref().map(|p| &p.path)
    }
}

/// Single-slot debounced mailbox with claim-on-read semantics
#[derive(Debug)]
pub struct ArrivalDetector {
    threshold: Duration,
    state: Mutex<DetectorState>,
}

impl ArrivalDetector {
    /// Create a detector using [`STABLE_THRESHOLD`]
    pub fn new() -> Self {
        Self::with_threshold(STABLE_THRESHOLD)
    }

    /// Create a detector with a custom stable threshold
    pub fn with_threshold(threshold: Duration) -> Self {
        Self {
            threshold,
            state: Mutex::new(DetectorState::default()),
        }
    }

    /// Quiet period required before a claim succeeds
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Record an event, replacing whatever was pending
    pub fn on_event(&self, event: ChangeEvent) {
        let mut state = self.state.lock();

        if let Some(prev) = &state.pending {
            if prev.path != event.path {
                debug!(
                    "Arrival of {} superseded by {}",
                    prev.path.display(),
                    event.path.display()
                );
            }
        }

        debug!("{} {}", event.kind, event.path.display());
        state.pending = Some(PendingArrival {
            path: event.path,
            last_event_at: event.observed_at,
        });
    }

    /// Claim the pending file if it has been quiet for longer than the threshold
    ///
    /// Returns the path at most once per arrival; the state is reset on a
    /// successful claim.
    pub fn poll_ready(&self, now: Instant) -> Option<PathBuf> {
        let mut state = self.state.lock();

        let elapsed = now.saturating_duration_since(state.last_event_at()?);
        if elapsed <= self.threshold {
            return None;
        }

        state.pending.take().map(|p| p.path)
    }

    /// Whether an arrival is waiting to be claimed
    pub fn has_pending(&self) -> bool {
        self.state.lock().has_pending()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> DetectorState {
        self.state.lock().clone()
    }
}

impl Default for ArrivalDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeSink for ArrivalDetector {
    fn on_event(&self, event: ChangeEvent) {
        ArrivalDetector::on_event(self, event)
    }
}
