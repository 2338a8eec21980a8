//! Foreground control loop
//!
//! On every tick the session asks the detector for a ready file. When one
//! is claimed it drives the transfer sequencer and reports each step to a
//! [`Presenter`].

use crate::detector::ArrivalDetector;
use crate::transfer::{shutdown_requested, TransferError, TransferSequencer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Receives session state changes for display
pub trait Presenter {
    /// Session is idle, scanning for a new file
    fn waiting(&mut self);

    /// A stable file was claimed and a transfer is starting
    fn file_detected(&mut self, path: &Path);

    /// The file was written to `written`
    fn transfer_complete(&mut self, written: &Path);

    /// The transfer failed; the session keeps watching
    fn transfer_failed(&mut self, path: &Path, error: &TransferError);
}

/// Counters reported when a session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub transferred: usize,
    pub failed: usize,
}

/// Couples a detector with a sequencer for one watch session
pub struct Session {
    detector: Arc<ArrivalDetector>,
    sequencer: TransferSequencer,
    device_dir: PathBuf,
    tick: Duration,
}

impl Session {
    pub fn new(
        detector: Arc<ArrivalDetector>,
        sequencer: TransferSequencer,
        device_dir: PathBuf,
        tick: Duration,
    ) -> Self {
        Self {
            detector,
            sequencer,
            device_dir,
            tick,
        }
    }

    /// Detector shared with the notification source
    pub fn detector(&self) -> &Arc<ArrivalDetector> {
        &self.detector
    }

    /// Sequencer driven by this session
    pub fn sequencer(&self) -> &TransferSequencer {
        &self.sequencer
    }

    /// Run until `shutdown` becomes true or its sender is dropped
    pub async fn run<P: Presenter>(
        &mut self,
        presenter: &mut P,
        mut shutdown: watch::Receiver<bool>,
    ) -> SessionStats {
        let mut stats = SessionStats::default();
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Session started, copying into {}", self.device_dir.display());
        presenter.waiting();

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }

            let Some(path) = self.detector.poll_ready(Instant::now()) else {
                continue;
            };

            info!("Detected new file: {}", path.display());
            presenter.file_detected(&path);

            match self.sequencer.transfer(&path, &self.device_dir, &mut shutdown).await {
                Ok(written) => {
                    stats.transferred += 1;
                    presenter.transfer_complete(&written);
                }
                Err(TransferError::Cancelled) => {
                    info!("Transfer of {} cancelled by shutdown", path.display());
                    break;
                }
                Err(e) => {
                    warn!("Transfer failed: {}", e);
                    stats.failed += 1;
                    presenter.transfer_failed(&path, &e);
                }
            }

            presenter.waiting();
        }

        info!(
            "Session stopped ({} transferred, {} failed)",
            stats.transferred, stats.failed
        );
        stats
    }
}
