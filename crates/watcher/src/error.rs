//! Error types for the notification source

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Failures while setting up the watch; all are fatal to the session
#[derive(Error, Debug)]
pub enum WatchError {
    /// Scan directory does not exist
    #[error("scan directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Scan path exists but is not a directory
    #[error("scan path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Pattern could not be compiled as a glob
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: ignore::Error,
    },

    /// Notify backend error
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}
