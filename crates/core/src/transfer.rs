//! Destination polling and copy sequencing
//!
//! A transfer walks through
//! `AwaitingDestination -> Settling -> Copying` and always ends back in
//! `Idle`, whether the copy succeeds, fails or is cancelled.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default granularity of the destination existence check
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default delay between the destination appearing and the copy
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Sequencer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    AwaitingDestination,
    Settling,
    Copying,
}

/// Errors returned by [`TransferSequencer::transfer`]
#[derive(Error, Debug)]
pub enum TransferError {
    /// The copy itself failed (permissions, disk full, destination gone, source removed)
    #[error("failed to copy {} to {}: {source}", .source_path.display(), .destination.display())]
    Copy {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Source path has no file name to copy under
    #[error("source path has no file name: {}", .0.display())]
    InvalidSource(PathBuf),

    /// Destination did not appear within the configured bound
    #[error("destination {} did not appear within {timeout:?}", .path.display())]
    DestinationTimeout { path: PathBuf, timeout: Duration },

    /// Shutdown was requested before copying started
    #[error("transfer cancelled")]
    Cancelled,
}

/// Timing and copy options for the sequencer
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// How often to check whether the destination exists
    pub poll_interval: Duration,
    /// Delay after the destination appears, for freshly mounted volumes
    pub settle_delay: Duration,
    /// Give up waiting for the destination after this long (None waits forever)
    pub destination_timeout: Option<Duration>,
    /// Copy to a temporary name and rename into place
    pub atomic_copy: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            destination_timeout: None,
            atomic_copy: false,
        }
    }
}

/// Waits for a destination directory and copies a file into it
#[derive(Debug)]
pub struct TransferSequencer {
    options: TransferOptions,
    state: TransferState,
}

impl TransferSequencer {
    pub fn new(options: TransferOptions) -> Self {
        Self {
            options,
            state: TransferState::Idle,
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Copy `source` into `dest_dir` once `dest_dir` exists
    ///
    /// Returns the path written, `dest_dir/<file name of source>`. An
    /// existing file at that path is overwritten. `shutdown` is checked
    /// while waiting and settling; once copying starts it runs to
    /// completion.
    pub async fn transfer(
        &mut self,
        source: &Path,
        dest_dir: &Path,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<PathBuf, TransferError> {
        let result = self.run(source, dest_dir, shutdown).await;
        self.state = TransferState::Idle;
        result
    }

    async fn run(
        &mut self,
        source: &Path,
        dest_dir: &Path,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<PathBuf, TransferError> {
        let file_name = source
            .file_name()
            .ok_or_else(|| TransferError::InvalidSource(source.to_path_buf()))?;
        let destination = dest_dir.join(file_name);

        self.state = TransferState::AwaitingDestination;
        self.await_destination(dest_dir, shutdown).await?;

        self.state = TransferState::Settling;
        debug!("Destination {} present, settling for {:?}", dest_dir.display(), self.options.settle_delay);
        tokio::select! {
            _ = tokio::time::sleep(self.options.settle_delay) => {}
            _ = shutdown_requested(shutdown) => return Err(TransferError::Cancelled),
        }

        self.state = TransferState::Copying;
        let bytes = if self.options.atomic_copy {
            copy_atomic(source, &destination).await
        } else {
            tokio::fs::copy(source, &destination).await
        }
        .map_err(|e| TransferError::Copy {
            source_path: source.to_path_buf(),
            destination: destination.clone(),
            source: e,
        })?;

        info!("Copied {} ({} bytes) to {}", source.display(), bytes, destination.display());
        Ok(destination)
    }

    async fn await_destination(
        &self,
        dest_dir: &Path,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), TransferError> {
        let started = Instant::now();
        let mut ticker = interval(self.options.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut logged = false;

        loop {
            if *shutdown.borrow() {
                return Err(TransferError::Cancelled);
            }

            if is_dir(dest_dir).await {
                return Ok(());
            }

            if !logged {
                info!("Waiting for destination {}", dest_dir.display());
                logged = true;
            }

            if let Some(timeout) = self.options.destination_timeout {
                if started.elapsed() >= timeout {
                    warn!("Gave up waiting for {} after {:?}", dest_dir.display(), timeout);
                    return Err(TransferError::DestinationTimeout {
                        path: dest_dir.to_path_buf(),
                        timeout,
                    });
                }
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_requested(shutdown) => return Err(TransferError::Cancelled),
            }
        }
    }
}

impl Default for TransferSequencer {
    fn default() -> Self {
        Self::new(TransferOptions::default())
    }
}

/// Resolves once shutdown has been requested or the sender is gone
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Copy to `.<name>.partial` next to `destination`, then rename over it
async fn copy_atomic(source: &Path, destination: &Path) -> io::Result<u64> {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let partial = destination.with_file_name(format!(".{name}.partial"));

    let bytes = match tokio::fs::copy(source, &partial).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&partial, destination).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }

    Ok(bytes)
}
