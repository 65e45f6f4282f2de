use std::sync::Arc;

use autohide_ipc::TrackingId;
use x11rb::protocol::xproto::{Atom, EventMask, NotifyDetail, Window};
use x11rb::protocol::Event;

use super::connection::X11Connection;
use crate::core::Registry;
use crate::error::InitError;
use crate::tracker::{EventPump, EventSink, PumpReady, PumpWaker};

/// Passive snooper: reports motion/leave on tracked windows and sends each
/// event back so the window still sees it.
pub struct X11Pump {
    conn: Arc<X11Connection>,
    registry: Arc<Registry<Window>>,
}

impl X11Pump {
    pub fn new(conn: Arc<X11Connection>, registry: Arc<Registry<Window>>) -> Self {
        Self { conn, registry }
    }
}

struct X11Waker(Arc<X11Connection>);

impl PumpWaker for X11Waker {
    fn wake(&self) {
        self.0.wake();
    }
}

/// Releases the pump's input selections on every exit path.
struct Subscription<'a> {
    conn: &'a X11Connection,
    registry: &'a Registry<Window>,
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        self.conn.end_tracking(self.registry);
        tracing::debug!("X11 input selections released");
    }
}

impl EventPump for X11Pump {
    fn run(self: Box<Self>, sink: EventSink, ready: PumpReady) {
        let X11Pump { conn, registry } = *self;

        if let Err(e) = conn.begin_tracking(&registry) {
            conn.end_tracking(&registry);
            let _ = ready.send(Err(InitError::Setup(e.to_string())));
            return;
        }
        let _subscription = Subscription {
            conn: &conn,
            registry: &registry,
        };

        if ready
            .send(Ok(Box::new(X11Waker(Arc::clone(&conn)))))
            .is_err()
        {
            return;
        }

        let wake = (conn.wake_window(), conn.atoms()._AUTOHIDE_WAKE);

        loop {
            let event = match conn.wait_for_event() {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!("X11 connection lost: {}", e);
                    break;
                }
            };

            let (action, forward) = route(&event, &registry, wake);
            match action {
                Route::Move { id, x, y } => sink.moved(id, x, y),
                Route::Leave { id } => sink.left(id),
                Route::Stop => {
                    tracing::debug!("X11 event pump woken for shutdown");
                    break;
                }
                Route::Ignore => {}
            }

            if let Some(mask) = forward {
                match event {
                    Event::MotionNotify(ev) => conn.forward(ev.event, mask, ev),
                    Event::LeaveNotify(ev) => conn.forward(ev.event, mask, ev),
                    _ => {}
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Move { id: TrackingId, x: i32, y: i32 },
    Leave { id: TrackingId },
    Stop,
    Ignore,
}

/// Decide what one X event means for the tracker, and with which mask it
/// must be echoed back to its window. Only real events on registered
/// windows are acted on or echoed.
fn route(
    event: &Event,
    registry: &Registry<Window>,
    wake: (Window, Atom),
) -> (Route, Option<EventMask>) {
    match event {
        Event::MotionNotify(ev) if !is_synthetic(ev.response_type) => {
            match registry.lookup_id(ev.event) {
                Some(id) => (
                    Route::Move {
                        id,
                        x: i32::from(ev.event_x),
                        y: i32::from(ev.event_y),
                    },
                    Some(EventMask::POINTER_MOTION),
                ),
                None => (Route::Ignore, None),
            }
        }
        Event::LeaveNotify(ev) if !is_synthetic(ev.response_type) => {
            match registry.lookup_id(ev.event) {
                Some(id) if reports_leave(ev.detail) => {
                    (Route::Leave { id }, Some(EventMask::LEAVE_WINDOW))
                }
                Some(_) => (Route::Ignore, Some(EventMask::LEAVE_WINDOW)),
                None => (Route::Ignore, None),
            }
        }
        Event::ClientMessage(ev) if (ev.window, ev.type_) == wake => (Route::Stop, None),
        _ => (Route::Ignore, None),
    }
}

/// Events produced by SendEvent carry the high bit in their code.
fn is_synthetic(response_type: u8) -> bool {
    response_type & 0x80 != 0
}

/// Moving into a child of the tracked window still counts as inside.
fn reports_leave(detail: NotifyDetail) -> bool {
    detail != NotifyDetail::INFERIOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use x11rb::protocol::xproto::{
        ClientMessageEvent, KeyButMask, LeaveNotifyEvent, Motion, MotionNotifyEvent, NotifyMode,
        LEAVE_NOTIFY_EVENT, MOTION_NOTIFY_EVENT,
    };

    const ROOT: Window = 0x100;
    const WAKE: (Window, Atom) = (0x200, 0x300);
    const TRACKED: Window = 0x1a00003;
    const OTHER: Window = 0x2c00007;

    fn registry() -> Registry<Window> {
        let registry = Registry::new();
        registry.bind(TRACKED, 5);
        registry
    }

    fn motion(window: Window, x: i16, y: i16) -> MotionNotifyEvent {
        MotionNotifyEvent {
            response_type: MOTION_NOTIFY_EVENT,
            detail: Motion::NORMAL,
            sequence: 1,
            time: 0,
            root: ROOT,
            event: window,
            child: 0,
            root_x: x + 300,
            root_y: y + 200,
            event_x: x,
            event_y: y,
            state: KeyButMask::from(0u16),
            same_screen: true,
        }
    }

    fn leave(window: Window, detail: NotifyDetail) -> LeaveNotifyEvent {
        LeaveNotifyEvent {
            response_type: LEAVE_NOTIFY_EVENT,
            detail,
            sequence: 1,
            time: 0,
            root: ROOT,
            event: window,
            child: 0,
            root_x: 0,
            root_y: 0,
            event_x: -1,
            event_y: 10,
            state: KeyButMask::from(0u16),
            mode: NotifyMode::NORMAL,
            same_screen_focus: 1,
        }
    }

    #[test]
    fn test_synthetic_events_are_skipped() {
        assert!(!is_synthetic(MOTION_NOTIFY_EVENT));
        assert!(is_synthetic(MOTION_NOTIFY_EVENT | 0x80));
        assert!(is_synthetic(LEAVE_NOTIFY_EVENT | 0x80));
    }

    #[test]
    fn test_leave_into_child_is_not_reported() {
        assert!(!reports_leave(NotifyDetail::INFERIOR));
        assert!(reports_leave(NotifyDetail::ANCESTOR));
        assert!(reports_leave(NotifyDetail::NONLINEAR));
        assert!(reports_leave(NotifyDetail::VIRTUAL));
    }

    #[test]
    fn test_motion_on_tracked_window_uses_window_coordinates() {
        let event = Event::MotionNotify(motion(TRACKED, 50, 20));

        assert_eq!(
            route(&event, &registry(), WAKE),
            (
                Route::Move { id: 5, x: 50, y: 20 },
                Some(EventMask::POINTER_MOTION)
            )
        );
    }

    #[test]
    fn test_motion_on_unregistered_window_is_ignored() {
        let event = Event::MotionNotify(motion(OTHER, 50, 20));
        assert_eq!(route(&event, &registry(), WAKE), (Route::Ignore, None));
    }

    #[test]
    fn test_echoed_events_are_ignored() {
        let mut moved = motion(TRACKED, 50, 20);
        moved.response_type |= 0x80;
        let mut left = leave(TRACKED, NotifyDetail::NONLINEAR);
        left.response_type |= 0x80;

        assert_eq!(
            route(&Event::MotionNotify(moved), &registry(), WAKE),
            (Route::Ignore, None)
        );
        assert_eq!(
            route(&Event::LeaveNotify(left), &registry(), WAKE),
            (Route::Ignore, None)
        );
    }

    #[test]
    fn test_leave_from_tracked_window() {
        let event = Event::LeaveNotify(leave(TRACKED, NotifyDetail::NONLINEAR));

        assert_eq!(
            route(&event, &registry(), WAKE),
            (Route::Leave { id: 5 }, Some(EventMask::LEAVE_WINDOW))
        );
    }

    #[test]
    fn test_leave_into_child_is_forwarded_but_not_reported() {
        let event = Event::LeaveNotify(leave(TRACKED, NotifyDetail::INFERIOR));

        assert_eq!(
            route(&event, &registry(), WAKE),
            (Route::Ignore, Some(EventMask::LEAVE_WINDOW))
        );
    }

    #[test]
    fn test_leave_from_unregistered_window_is_ignored() {
        let event = Event::LeaveNotify(leave(OTHER, NotifyDetail::NONLINEAR));
        assert_eq!(route(&event, &registry(), WAKE), (Route::Ignore, None));
    }

    #[test]
    fn test_wake_message_stops_pump() {
        let wake = ClientMessageEvent::new(32, WAKE.0, WAKE.1, [0u32; 5]);
        assert_eq!(
            route(&Event::ClientMessage(wake), &registry(), WAKE),
            (Route::Stop, None)
        );

        let foreign = ClientMessageEvent::new(32, TRACKED, WAKE.1, [0u32; 5]);
        assert_eq!(
            route(&Event::ClientMessage(foreign), &registry(), WAKE),
            (Route::Ignore, None)
        );
    }
}
