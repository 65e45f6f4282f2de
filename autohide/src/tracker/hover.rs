use autohide_ipc::TrackingId;

use super::EventSink;
use crate::core::{map_coordinates, EnteredSet, Rect, Registry};
use crate::platform::WindowProbe;

/// Turns raw screen samples into move/leave callbacks for backends whose OS
/// only reports "the pointer is here".
#[derive(Debug)]
pub struct HoverDispatcher {
    entered: EnteredSet,
    sink: EventSink,
}

impl HoverDispatcher {
    pub fn new(sink: EventSink) -> Self {
        Self {
            entered: EnteredSet::new(),
            sink,
        }
    }

    /// `hit` is the tracked window under the pointer and its screen rect.
    /// Leaves for previously entered windows are delivered before the move.
    pub fn dispatch(&mut self, hit: Option<(TrackingId, Rect)>, x: i32, y: i32) {
        for id in self.entered.advance(hit.map(|(id, _)| id)) {
            self.sink.left(id);
        }

        if let Some((id, rect)) = hit {
            let (wx, wy) = map_coordinates(0, 0, rect.x, rect.y, x, y);
            self.sink.moved(id, wx, wy);
        }
    }
}

/// Resolve the tracked window under a screen point, if any.
pub fn hit_test<P: WindowProbe>(
    probe: &P,
    registry: &Registry<P::Handle>,
    x: i32,
    y: i32,
) -> Option<(TrackingId, Rect)> {
    let handle = probe.topmost_window_at(x, y)?;
    let id = registry.lookup_id(handle)?;
    let rect = probe.geometry(handle)?;
    rect.contains(x, y).then_some((id, rect))
}
