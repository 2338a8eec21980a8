//! File system notification source for dropcopy
//!
//! Watches a single directory (non-recursive) and forwards create/modify
//! events for files matching a glob pattern to a [`ChangeSink`].

pub mod error;
pub mod filter;

pub use error::{Result, WatchError};
pub use filter::PatternFilter;

use dropcopy_core::{ChangeEvent, ChangeKind, ChangeSink, CopyConfig};
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Live watch on the scan directory; dropping it stops the watch
#[derive(Debug)]
pub struct Watcher {
    scan_dir: PathBuf,
    filter: PatternFilter,
    inner: RecommendedWatcher,
}

impl Watcher {
    /// Start watching `scan_dir`, sending matching events to `sink`
    pub fn start(scan_dir: &Path, filter: PatternFilter, sink: Arc<dyn ChangeSink>) -> Result<Self> {
        if !scan_dir.exists() {
            return Err(WatchError::DirectoryNotFound(scan_dir.to_path_buf()));
        }
        if !scan_dir.is_dir() {
            return Err(WatchError::NotADirectory(scan_dir.to_path_buf()));
        }

        let callback_filter = filter.clone();
        let mut inner = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => dispatch(event, &callback_filter, sink.as_ref()),
                Err(e) => error!("Watch error: {e}"),
            }
        })?;
        inner.watch(scan_dir, RecursiveMode::NonRecursive)?;

        info!(
            "Watching {} for '{}'",
            scan_dir.display(),
            filter.pattern()
        );

        Ok(Self {
            scan_dir: scan_dir.to_path_buf(),
            filter,
            inner,
        })
    }

    /// Start a watch described by a session config
    pub fn from_config(config: &CopyConfig, sink: Arc<dyn ChangeSink>) -> Result<Self> {
        let filter = PatternFilter::new(&config.pattern, config.case_sensitive)?;
        Self::start(&config.scan_dir, filter, sink)
    }

    pub fn scan_dir(&self) -> &Path {
        &self.scan_dir
    }

    pub fn pattern(&self) -> &str {
        self.filter.pattern()
    }

    /// Stop watching
    pub fn stop(mut self) -> Result<()> {
        self.inner.unwatch(&self.scan_dir)?;
        info!("Stopped watching {}", self.scan_dir.display());
        Ok(())
    }
}

/// Map a notify event kind onto the changes that signal an arrival
///
/// A rename into the directory counts as a creation, which is how browsers
/// finish a download (`file.uf2.crdownload` -> `file.uf2`). Backends that
/// cannot tell the two sides of a rename apart report `RenameMode::Any`;
/// the side that no longer exists is dropped when dispatching.
pub fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(CreateKind::Folder) => None,
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => None,
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        _ => None,
    }
}

fn dispatch(event: notify::Event, filter: &PatternFilter, sink: &dyn ChangeSink) {
    let Some(kind) = change_kind(&event.kind) else {
        return;
    };

    let is_rename = matches!(event.kind, EventKind::Modify(ModifyKind::Name(_)));

    for path in event.paths {
        if !filter.matches(&path) || path.is_dir() {
            continue;
        }
        // The old name of a rename is gone by now
        if is_rename && !path.exists() {
            continue;
        }
        debug!("{:?} -> {} {}", event.kind, kind, path.display());
        sink.on_event(ChangeEvent::new(kind, path));
    }
}
