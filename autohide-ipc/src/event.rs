use serde::{Deserialize, Serialize};

/// Caller-assigned name for one logical tracked window.
pub type TrackingId = u64;

/// Pointer event emitted by the tracker, in window-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerEvent {
    /// Pointer moved inside a tracked window; origin is the window's top-left.
    Move { id: TrackingId, x: i32, y: i32 },
    /// Pointer left a tracked window.
    Leave { id: TrackingId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_event_json_shape() {
        let event = TrackerEvent::Move { id: 3, x: 50, y: -2 };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"move","id":3,"x":50,"y":-2}"#);
    }

    #[test]
    fn test_leave_event_json_shape() {
        let json = serde_json::to_string(&TrackerEvent::Leave { id: 7 }).unwrap();
        assert_eq!(json, r#"{"type":"leave","id":7}"#);
    }

    #[test]
    fn test_parse_leave_event() {
        let event: TrackerEvent = serde_json::from_str(r#"{"type":"leave","id":1}"#).unwrap();
        assert_eq!(event, TrackerEvent::Leave { id: 1 });
    }
}
