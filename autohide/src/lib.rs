//! Cross-platform pointer tracking for the windows of one target application.
//!
//! [`Driver`] discovers target windows, answers "where is the pointer inside
//! window N" and hands out an [`EventTracker`] that streams move/leave events
//! from a background thread.

pub mod core;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod platform;
#[cfg(unix)]
mod process;
pub mod tracker;

#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(windows)]
pub mod win32;
#[cfg(all(unix, not(target_os = "macos")))]
pub mod x11;

pub use autohide_ipc::{TargetApp, TrackerEvent, TrackingId, WindowSummary};
pub use driver::{Driver, NativeDriver, NativeProbe};
pub use error::InitError;
pub use tracker::{EventTracker, TrackerState};
