//! X11 backend built on x11rb: EWMH client lists for discovery and passive
//! pointer-motion snooping for events.

mod connection;
mod probe;
mod pump;

pub use probe::X11Probe;
