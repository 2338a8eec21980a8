//! Common utilities for integration tests
//!
//! Runs a real watch session (notify watcher, detector, sequencer) on
//! temporary directories and records what the presenter saw, with timing.

#![allow(dead_code)]

use dropcopy_core::{
    ArrivalDetector, CopyConfig, Presenter, Session, SessionStats, TransferError, TransferState,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use watcher::Watcher;

/// Presenter notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Waiting,
    Detected(PathBuf),
    Complete(PathBuf),
    Failed(PathBuf),
}

/// Shared, timestamped record of presenter calls
#[derive(Clone, Default)]
pub struct Timeline {
    entries: Arc<Mutex<Vec<(Instant, Step)>>>,
}

impl Timeline {
    fn push(&self, step: Step) {
        self.entries.lock().push((Instant::now(), step));
    }

    pub fn steps(&self) -> Vec<Step> {
        self.entries.lock().iter().map(|(_, s)| s.clone()).collect()
    }

    /// Time of the first step matching `pred`
    pub fn first(&self, pred: impl Fn(&Step) -> bool) -> Option<Instant> {
        self.entries
            .lock()
            .iter()
            .find(|(_, s)| pred(s))
            .map(|(at, _)| *at)
    }

    /// Poll until a step matching `pred` shows up
    pub async fn wait_for(&self, pred: impl Fn(&Step) -> bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.first(&pred).is_some() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}

struct RecordingPresenter {
    timeline: Timeline,
}

impl Presenter for RecordingPresenter {
    fn waiting(&mut self) {
        self.timeline.push(Step::Waiting);
    }

    fn file_detected(&mut self, path: &Path) {
        self.timeline.push(Step::Detected(path.to_path_buf()));
    }

    fn transfer_complete(&mut self, written: &Path) {
        self.timeline.push(Step::Complete(written.to_path_buf()));
    }

    fn transfer_failed(&mut self, path: &Path, _error: &TransferError) {
        self.timeline.push(Step::Failed(path.to_path_buf()));
    }
}

/// Config pointing at test directories, with the default 1s threshold and
/// shortened settle delay
pub fn test_config(scan_dir: &Path, device_dir: &Path) -> CopyConfig {
    CopyConfig {
        scan_dir: scan_dir.to_path_buf(),
        device_dir: device_dir.to_path_buf(),
        poll_interval_ms: 50,
        settle_delay_ms: 100,
        ..CopyConfig::default()
    }
}

/// A session running in the background
pub struct RunningSession {
    pub detector: Arc<ArrivalDetector>,
    pub timeline: Timeline,
    stop: watch::Sender<bool>,
    handle: JoinHandle<(SessionStats, TransferState)>,
    watcher: Watcher,
}

impl RunningSession {
    pub fn start(config: &CopyConfig) -> Self {
        let detector = Arc::new(ArrivalDetector::with_threshold(config.stable_threshold()));
        let watcher = Watcher::from_config(config, detector.clone()).unwrap();

        let timeline = Timeline::default();
        let mut presenter = RecordingPresenter {
            timeline: timeline.clone(),
        };
        let (stop, stop_rx) = watch::channel(false);
        let mut session = Session::new(
            detector.clone(),
            dropcopy_core::TransferSequencer::new(config.transfer_options()),
            config.device_dir.clone(),
            config.poll_interval(),
        );

        let handle = tokio::spawn(async move {
            let stats = session.run(&mut presenter, stop_rx).await;
            (stats, session.sequencer().state())
        });

        Self {
            detector,
            timeline,
            stop,
            handle,
            watcher,
        }
    }

    /// Request shutdown and wait for the session to return
    pub async fn shutdown(self) -> (SessionStats, TransferState) {
        let _ = self.stop.send(true);
        let result = self.handle.await.unwrap();
        self.watcher.stop().unwrap();
        result
    }
}
