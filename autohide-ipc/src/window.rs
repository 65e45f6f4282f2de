use serde::{Deserialize, Serialize};

/// One row of a top-level window listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSummary {
    /// Native handle, formatted as hex.
    pub handle: String,
    pub pid: Option<u32>,
    pub title: Option<String>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub is_target: bool,
    /// Tracking id, when the window is registered.
    pub id: Option<u64>,
}
