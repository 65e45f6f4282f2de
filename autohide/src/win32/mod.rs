//! Win32 backend: `EnumWindows` discovery and a `WH_MOUSE_LL` hook pump.

mod probe;
mod pump;

pub use probe::Win32Probe;
