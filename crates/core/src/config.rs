//! Session configuration
//!
//! Values come from, in increasing priority:
//! 1. Built-in platform defaults
//! 2. The TOML config file (`<config dir>/dropcopy/config.toml` or `--config`)
//! 3. Command-line flags (applied by the CLI)

use crate::transfer::TransferOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default glob pattern for files to pick up
pub const DEFAULT_PATTERN: &str = "*.uf2";

/// Volume label of the bootloader drive the defaults target
pub const DEFAULT_DEVICE_LABEL: &str = "CPLAYBOOT";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for a watch session, immutable once the session starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    /// Directory watched for new files
    pub scan_dir: PathBuf,

    /// Directory the file is copied into once it exists
    pub device_dir: PathBuf,

    /// Glob pattern matched against file names
    pub pattern: String,

    /// Match the pattern case-sensitively (default: false)
    pub case_sensitive: bool,

    /// Quiet time after the last event before a file is ready
    pub stable_threshold_ms: u64,

    /// Tick of the control loop and the destination check
    pub poll_interval_ms: u64,

    /// Delay after the destination appears before copying
    pub settle_delay_ms: u64,

    /// Stop waiting for the destination after this many seconds (unset waits forever)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_timeout_secs: Option<u64>,

    /// Copy to a temporary name and rename into place
    pub atomic_copy: bool,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            scan_dir: default_scan_dir(),
            device_dir: default_device_dir(),
            pattern: DEFAULT_PATTERN.to_string(),
            case_sensitive: false,
            stable_threshold_ms: 1000,
            poll_interval_ms: 100,
            settle_delay_ms: 500,
            destination_timeout_secs: None,
            atomic_copy: false,
        }
    }
}

impl CopyConfig {
    /// Load from a TOML file; missing keys take their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Load from the default location, or defaults if no file exists there
    pub fn load_default() -> Result<Self, ConfigError> {
        match config_file_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// The poll interval must be shorter than the stable threshold,
    /// otherwise every file would be reported ready on the first tick
    /// after its last event.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pattern.trim().is_empty() {
            return Err(ConfigError::Invalid("pattern must not be empty".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be at least 1".into()));
        }
        if self.poll_interval_ms >= self.stable_threshold_ms {
            return Err(ConfigError::Invalid(format!(
                "poll_interval_ms ({}) must be less than stable_threshold_ms ({})",
                self.poll_interval_ms, self.stable_threshold_ms
            )));
        }
        if self.destination_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "destination_timeout_secs must be at least 1 (omit it to wait forever)".into(),
            ));
        }
        Ok(())
    }

    pub fn stable_threshold(&self) -> Duration {
        Duration::from_millis(self.stable_threshold_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            poll_interval: self.poll_interval(),
            settle_delay: self.settle_delay(),
            destination_timeout: self.destination_timeout_secs.map(Duration::from_secs),
            atomic_copy: self.atomic_copy,
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> String {
        // Every field is a plain value, so serialization cannot fail
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

/// Location of the user config file
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dropcopy").join("config.toml"))
}

fn default_scan_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}

#[cfg(target_os = "macos")]
fn default_device_dir() -> PathBuf {
    Path::new("/Volumes").join(DEFAULT_DEVICE_LABEL)
}

#[cfg(target_os = "windows")]
fn default_device_dir() -> PathBuf {
    PathBuf::from(r"D:\")
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn default_device_dir() -> PathBuf {
    let user = std::env::var("USER").unwrap_or_default();
    if user.is_empty() {
        Path::new("/media").join(DEFAULT_DEVICE_LABEL)
    } else {
        Path::new("/media").join(user).join(DEFAULT_DEVICE_LABEL)
    }
}
