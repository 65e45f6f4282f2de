pub mod event;
pub mod target;
pub mod window;

pub use event::{TrackerEvent, TrackingId};
pub use target::TargetApp;
pub use window::WindowSummary;
