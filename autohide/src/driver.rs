use std::sync::Arc;

use autohide_ipc::{TargetApp, TrackingId, WindowSummary};

use crate::core::{map_coordinates, Registry};
use crate::discovery;
use crate::error::InitError;
use crate::platform::WindowProbe;
use crate::tracker::{EventSink, EventTracker};

/// Platform-neutral entry point: discovers target windows, answers
/// geometry queries and hands out event trackers.
///
/// Query methods are safe to call from any thread while a tracker runs.
pub struct Driver<P: WindowProbe> {
    probe: Arc<P>,
    registry: Arc<Registry<P::Handle>>,
}

impl<P: WindowProbe> Driver<P> {
    pub fn with_probe(probe: P) -> Self {
        Self {
            probe: Arc::new(probe),
            registry: Arc::new(Registry::new()),
        }
    }

    /// Pointer position in the window's own coordinates, or `None` when the
    /// id is unknown, the pointer is outside the window, or the window is
    /// covered at the pointer.
    pub fn window_coordinates(&self, id: TrackingId) -> Option<(i32, i32)> {
        let handle = self.registry.lookup_handle(id)?;
        let rect = self.probe.geometry(handle)?;
        let (px, py) = self.probe.pointer_position(handle)?;

        if !rect.contains(px, py) {
            return None;
        }
        if let Some(top) = self.probe.topmost_window_at(px, py) {
            if top != handle {
                return None;
            }
        }

        Some(map_coordinates(0, 0, rect.x, rect.y, px, py))
    }

    pub fn window_width(&self, id: TrackingId) -> Option<u32> {
        let handle = self.registry.lookup_handle(id)?;
        self.probe.geometry(handle).map(|rect| rect.width)
    }

    /// Bind `id` to the next unregistered target window.
    /// Returns true only when a new binding was made.
    pub fn register_new_window(&self, id: TrackingId) -> bool {
        if self.registry.is_bound(id) {
            return false;
        }
        discovery::register_new_window(self.probe.as_ref(), &self.registry, id).is_some()
    }

    pub fn is_registered(&self, id: TrackingId) -> bool {
        self.registry.is_bound(id)
    }

    pub fn window_handle(&self, id: TrackingId) -> Option<P::Handle> {
        self.registry.lookup_handle(id)
    }

    /// Snapshot of every top-level window, for diagnostics.
    pub fn list_windows(&self) -> Vec<WindowSummary> {
        self.probe
            .enumerate_top_level_windows()
            .into_iter()
            .map(|handle| {
                let rect = self.probe.geometry(handle);
                WindowSummary {
                    handle: format!("{:#x}", handle),
                    pid: self.probe.pid_of(handle),
                    title: self.probe.title_of(handle),
                    x: rect.map(|r| r.x),
                    y: rect.map(|r| r.y),
                    width: rect.map(|r| r.width),
                    height: rect.map(|r| r.height),
                    is_target: self.probe.is_target_window(handle),
                    id: self.registry.lookup_id(handle),
                }
            })
            .collect()
    }

    /// Build an idle tracker for the windows registered now and later.
    pub fn tracker<M, L>(&self, on_move: M, on_leave: L) -> EventTracker
    where
        M: Fn(TrackingId, i32, i32) + Send + Sync + 'static,
        L: Fn(TrackingId) + Send + Sync + 'static,
    {
        let pump = self.probe.event_pump(Arc::clone(&self.registry));
        EventTracker::new(pump, EventSink::new(on_move, on_leave))
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
pub type NativeProbe = crate::x11::X11Probe;
#[cfg(target_os = "macos")]
pub type NativeProbe = crate::macos::MacProbe;
#[cfg(windows)]
pub type NativeProbe = crate::win32::Win32Probe;

pub type NativeDriver = Driver<NativeProbe>;

impl Driver<NativeProbe> {
    /// Connect to the desktop session and track windows of `target`.
    pub fn open(target: TargetApp) -> Result<Self, InitError> {
        Ok(Self::with_probe(NativeProbe::open(target)?))
    }

    pub fn new() -> Result<Self, InitError> {
        Self::open(TargetApp::default())
    }
}
