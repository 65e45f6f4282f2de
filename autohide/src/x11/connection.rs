use std::sync::{Mutex, MutexGuard, PoisonError};

use x11rb::connection::Connection;
use x11rb::errors::ConnectionError;
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use crate::core::{Rect, Registry};
use crate::error::InitError;

/// Upper bound for property reads, in 32-bit units.
const MAX_PROPERTY_LEN: u32 = 1024;

/// Events the pump snoops on every tracked window.
fn track_mask() -> EventMask {
    EventMask::POINTER_MOTION | EventMask::LEAVE_WINDOW
}

x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        _NET_CLIENT_LIST,
        _WIN_CLIENT_LIST,
        _NET_WM_PID,
        _NET_WM_NAME,
        UTF8_STRING,
        _AUTOHIDE_WAKE,
    }
}

struct Guarded {
    /// A pump is draining this connection's event queue.
    pumping: bool,
}

/// Display connection shared by the probe and the pump thread.
///
/// Every request goes through `guard()`. The pump's blocking wait does not,
/// so queries from caller threads proceed while it sleeps.
pub struct X11Connection {
    conn: RustConnection,
    root: Window,
    wake_window: Window,
    atoms: Atoms,
    lock: Mutex<Guarded>,
}

impl X11Connection {
    pub fn open() -> Result<Self, InitError> {
        let (conn, screen_num) =
            RustConnection::connect(None).map_err(|e| InitError::Connect(e.to_string()))?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| InitError::Setup(format!("screen {} not found", screen_num)))?;

        let atoms = Atoms::new(&conn)
            .map_err(setup_error)?
            .reply()
            .map_err(setup_error)?;

        // Unmapped input-only window that receives the stop sentinel.
        let wake_window = conn.generate_id().map_err(setup_error)?;
        conn.create_window(
            0,
            wake_window,
            root,
            -1,
            -1,
            1,
            1,
            0,
            WindowClass::INPUT_ONLY,
            0,
            &CreateWindowAux::new(),
        )
        .map_err(setup_error)?
        .check()
        .map_err(setup_error)?;

        tracing::info!("Connected to X11 display (screen {}, root {:#x})", screen_num, root);

        Ok(Self {
            conn,
            root,
            wake_window,
            atoms,
            lock: Mutex::new(Guarded { pumping: false }),
        })
    }

    fn guard(&self) -> MutexGuard<'_, Guarded> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    pub fn wake_window(&self) -> Window {
        self.wake_window
    }

    fn property32(&self, window: Window, property: Atom, type_: Atom) -> Option<Vec<u32>> {
        let reply = self
            .conn
            .get_property(false, window, property, type_, 0, MAX_PROPERTY_LEN)
            .ok()?
            .reply()
            .ok()?;
        if reply.type_ != type_ {
            return None;
        }
        let values: Vec<u32> = reply.value32()?.collect();
        (!values.is_empty()).then_some(values)
    }

    fn property_string(&self, window: Window, property: Atom, type_: Atom) -> Option<String> {
        let reply = self
            .conn
            .get_property(false, window, property, type_, 0, MAX_PROPERTY_LEN)
            .ok()?
            .reply()
            .ok()?;
        if reply.type_ != type_ || reply.value.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(&reply.value).into_owned())
    }

    /// Top-level client windows as published by the window manager.
    pub fn client_list(&self) -> Vec<Window> {
        let _g = self.guard();
        self.property32(self.root, self.atoms._NET_CLIENT_LIST, AtomEnum::WINDOW.into())
            .or_else(|| {
                self.property32(self.root, self.atoms._WIN_CLIENT_LIST, AtomEnum::CARDINAL.into())
            })
            .unwrap_or_else(|| {
                tracing::debug!("Cannot read _NET_CLIENT_LIST or _WIN_CLIENT_LIST");
                Vec::new()
            })
    }

    pub fn pid(&self, window: Window) -> Option<u32> {
        let _g = self.guard();
        self.property32(window, self.atoms._NET_WM_PID, AtomEnum::CARDINAL.into())?
            .first()
            .copied()
    }

    pub fn title(&self, window: Window) -> Option<String> {
        let _g = self.guard();
        self.property_string(window, AtomEnum::WM_NAME.into(), AtomEnum::STRING.into())
            .or_else(|| {
                self.property_string(window, self.atoms._NET_WM_NAME, self.atoms.UTF8_STRING)
            })
    }

    /// Window rectangle with its origin translated into root coordinates.
    pub fn geometry(&self, window: Window) -> Option<Rect> {
        let _g = self.guard();
        let geom = self.conn.get_geometry(window).ok()?.reply().ok()?;
        let (x, y) = if window == geom.root {
            (i32::from(geom.x), i32::from(geom.y))
        } else {
            let origin = self
                .conn
                .translate_coordinates(window, geom.root, 0, 0)
                .ok()?
                .reply()
                .ok()?;
            (i32::from(origin.dst_x), i32::from(origin.dst_y))
        };
        Some(Rect::new(x, y, geom.width.into(), geom.height.into()))
    }

    /// Pointer position in root coordinates, if it is on `window`'s screen.
    pub fn pointer(&self, window: Window) -> Option<(i32, i32)> {
        let _g = self.guard();
        let reply = self.conn.query_pointer(window).ok()?.reply().ok()?;
        reply
            .same_screen
            .then(|| (i32::from(reply.root_x), i32::from(reply.root_y)))
    }

    fn select_input(&self, window: Window, mask: EventMask) -> Result<(), ConnectionError> {
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().event_mask(mask))?;
        Ok(())
    }

    /// Subscribe a newly bound window if a pump is currently running.
    pub fn subscribe(&self, window: Window) {
        let g = self.guard();
        if !g.pumping {
            return;
        }
        if let Err(e) = self
            .select_input(window, track_mask())
            .and_then(|_| self.conn.flush())
        {
            tracing::warn!("Failed to select input on {:#x}: {}", window, e);
        }
    }

    /// Subscribe every registered window and discard events queued while idle.
    pub fn begin_tracking(&self, registry: &Registry<Window>) -> Result<(), ConnectionError> {
        let mut g = self.guard();
        g.pumping = true;
        if registry.is_empty() {
            tracing::debug!("No windows registered yet, selecting input as they are bound");
        }
        for window in registry.handles() {
            if let Err(e) = self.select_input(window, track_mask()) {
                tracing::debug!("Failed to select input on {:#x}: {}", window, e);
            }
        }
        self.conn.flush()?;
        self.drain_events();
        Ok(())
    }

    /// Drop every subscription made by `begin_tracking`/`subscribe`.
    pub fn end_tracking(&self, registry: &Registry<Window>) {
        let mut g = self.guard();
        g.pumping = false;
        for window in registry.handles() {
            if let Err(e) = self.select_input(window, EventMask::NO_EVENT) {
                tracing::debug!("Failed to deselect input on {:#x}: {}", window, e);
            }
        }
        if let Err(e) = self.conn.flush() {
            tracing::warn!("Failed to flush X11 connection: {}", e);
        }
        self.drain_events();
    }

    fn drain_events(&self) {
        while let Ok(Some(_)) = self.conn.poll_for_event() {}
    }

    /// Block until the next event. Not serialized with queries.
    pub fn wait_for_event(&self) -> Result<Event, ConnectionError> {
        self.conn.wait_for_event()
    }

    /// Send a snooped event back to `window` as a synthetic copy.
    pub fn forward<E: Into<[u8; 32]>>(&self, window: Window, mask: EventMask, event: E) {
        let _g = self.guard();
        if let Err(e) = self
            .conn
            .send_event(false, window, mask, event)
            .and_then(|_| self.conn.flush())
        {
            tracing::debug!("Failed to forward event to {:#x}: {}", window, e);
        }
    }

    /// Post the stop sentinel to our own input-only window.
    pub fn wake(&self) {
        let event = ClientMessageEvent::new(
            32,
            self.wake_window,
            self.atoms._AUTOHIDE_WAKE,
            [0u32; 5],
        );
        let _g = self.guard();
        if let Err(e) = self
            .conn
            .send_event(false, self.wake_window, EventMask::NO_EVENT, event)
            .and_then(|_| self.conn.flush())
        {
            tracing::warn!("Failed to wake X11 event pump: {}", e);
        }
    }
}

fn setup_error(e: impl std::fmt::Display) -> InitError {
    InitError::Setup(e.to_string())
}
