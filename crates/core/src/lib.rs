//! Core of dropcopy
//!
//! This crate provides:
//! - Change events and the [`ChangeSink`] seam used by notification sources
//! - The debounced single-slot [`ArrivalDetector`]
//! - The polling [`TransferSequencer`] (await destination, settle, copy)
//! - The [`Session`] control loop and its [`Presenter`] interface
//! - Session configuration

pub mod config;
pub mod detector;
pub mod event;
pub mod session;
pub mod transfer;

// Re-exports
pub use config::{ConfigError, CopyConfig};
pub use detector::{ArrivalDetector, DetectorState, PendingArrival, STABLE_THRESHOLD};
pub use event::{ChangeEvent, ChangeKind, ChangeSink};
pub use session::{Presenter, Session, SessionStats};
pub use transfer::{TransferError, TransferOptions, TransferSequencer, TransferState};
