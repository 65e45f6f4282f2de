use thiserror::Error;

/// Fatal failures while bringing up the windowing connection or the event pump.
///
/// Transient probe failures never show up here; they collapse to `None`.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Failed to connect to the windowing system: {0}")]
    Connect(String),

    #[error("Windowing system setup failed: {0}")]
    Setup(String),

    #[error("Failed to install mouse hook: {0}")]
    HookInstall(String),

    #[error("Failed to create event tap: {0}")]
    EventTap(String),

    #[error("Tracker was already started")]
    AlreadyStarted,
}
