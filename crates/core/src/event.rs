//! File arrival events
//!
//! Events are produced by the notification source and consumed by a
//! [`ChangeSink`], normally the [`ArrivalDetector`](crate::ArrivalDetector).

use std::path::PathBuf;
use std::time::Instant;

/// A single create/modify observation for a file in the scan directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: ChangeKind,
    /// When the notification source saw the change
    pub observed_at: Instant,
}

impl ChangeEvent {
    /// Create an event stamped with the current instant
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self::at(kind, path, Instant::now())
    }

    /// Create an event with an explicit observation time
    pub fn at(kind: ChangeKind, path: impl Into<PathBuf>, observed_at: Instant) -> Self {
        Self {
            path: path.into(),
            kind,
            observed_at,
        }
    }
}

/// Type of file system change relevant to arrival detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// File created
    Created,
    /// File contents modified
    Modified,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Created => f.write_str("created"),
            ChangeKind::Modified => f.write_str("modified"),
        }
    }
}

/// Receiver of change events
///
/// Implementations must tolerate being called from the notification
/// source's own thread, concurrently with readers on other threads.
pub trait ChangeSink: Send + Sync {
    /// Record one change event
    fn on_event(&self, event: ChangeEvent);
}
