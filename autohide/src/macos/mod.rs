//! macOS backend: CGWindowList discovery and a listen-only CGEventTap pump.

mod probe;
mod pump;

pub use probe::MacProbe;
