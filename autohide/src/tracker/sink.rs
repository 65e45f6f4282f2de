use std::fmt;
use std::sync::Arc;

use autohide_ipc::TrackingId;

pub type MoveCallback = dyn Fn(TrackingId, i32, i32) + Send + Sync;
pub type LeaveCallback = dyn Fn(TrackingId) + Send + Sync;

/// Caller-supplied move/leave callbacks, invoked from the pump thread.
#[derive(Clone)]
pub struct EventSink {
    on_move: Arc<MoveCallback>,
    on_leave: Arc<LeaveCallback>,
}

impl EventSink {
    pub fn new<M, L>(on_move: M, on_leave: L) -> Self
    where
        M: Fn(TrackingId, i32, i32) + Send + Sync + 'static,
        L: Fn(TrackingId) + Send + Sync + 'static,
    {
        Self {
            on_move: Arc::new(on_move),
            on_leave: Arc::new(on_leave),
        }
    }

    /// Report a pointer position already in the window's own coordinates.
    pub fn moved(&self, id: TrackingId, x: i32, y: i32) {
        tracing::trace!("move id={} ({}, {})", id, x, y);
        (self.on_move)(id, x, y);
    }

    pub fn left(&self, id: TrackingId) {
        tracing::trace!("leave id={}", id);
        (self.on_leave)(id);
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}
